//! Simulated Mezon web client on top of `MockEngine`.
//!
//! Only the behaviour the page objects and helpers depend on is modelled:
//! the composer, hover actions on messages, pinned messages, DM/group
//! creation, clan-settings uploads, the profile avatar and the onboarding
//! checklist.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mezon_e2e::catalog::format_e2e_selector;
use mezon_e2e::config::SuiteConfig;
use mezon_e2e::engine::{ActionKind, MockDom, MockElement, MockEngine};
use mezon_e2e::{Deadline, Selector, TestContext};

/// Upload limit the simulated clan settings enforce
pub const SIM_UPLOAD_LIMIT: u64 = 1024 * 1024;

/// Default avatar URL
pub const DEFAULT_AVATAR: &str = "https://cdn.mezon.test/avatar/default.png";

const ACTIONS: [&str; 6] = [
    "chat.message.action.edit",
    "chat.message.action.delete",
    "chat.message.action.reply",
    "chat.message.action.forward",
    "chat.message.action.pin",
    "chat.message.action.react",
];

/// Forward destinations and whether each is a direct message
const FORWARD_TARGETS: [(&str, bool); 2] = [("general", false), ("qa.bob", true)];

const ACTION_LABELS: [&str; 6] = [
    "Edit Message",
    "Delete Message",
    "Reply",
    "Forward Message",
    "Pin Message",
    "Add Reaction",
];

/// Variations of the simulated client
#[derive(Debug, Clone, Copy, Default)]
pub struct SimOptions {
    /// Message actions live behind the toolbar's "more" button
    pub actions_behind_more: bool,
    /// The build has no pin action at all
    pub without_pin: bool,
}

#[derive(Debug, Default)]
struct SimState {
    messages: Vec<(u64, u64)>,
    hovered_item: Option<u64>,
    pinned: Vec<String>,
    jump_target: Option<String>,
    selected_members: Vec<String>,
    adding_to_group: bool,
    groups: Vec<String>,
    open_conversation: Option<String>,
    pending_avatar: Option<String>,
    first_message_sent: bool,
    conversations: HashMap<String, Vec<String>>,
    forwarding: Option<String>,
    forward_target: Option<String>,
}

type Shared = Arc<Mutex<SimState>>;

/// `data-e2e` selector of a catalog key
pub fn e2e(key: &str) -> Selector {
    Selector::css(format_e2e_selector(key))
}

fn node(key: &str) -> MockElement {
    MockElement::new().with_e2e(key)
}

fn first(dom: &MockDom, key: &str) -> Option<u64> {
    dom.find(&e2e(key)).first().copied()
}

fn text_of(dom: &MockDom, id: u64) -> String {
    dom.get(id).map(|e| e.text.clone()).unwrap_or_default()
}

fn value_of(dom: &MockDom, id: u64) -> String {
    dom.get(id).map(|e| e.value.clone()).unwrap_or_default()
}

fn remove_keys(dom: &mut MockDom, keys: &[&str]) {
    for key in keys {
        dom.remove_matching(&e2e(key));
    }
}

fn hide_actions(dom: &mut MockDom) {
    for key in ACTIONS {
        dom.set_visible(&e2e(key), false);
    }
    dom.set_visible(&e2e("chat.message.toolbar.more"), false);
}

/// Context over `engine` with default configuration
pub fn context(engine: &MockEngine) -> TestContext {
    TestContext::new(
        Arc::new(engine.clone()),
        Arc::new(SuiteConfig::default()),
        "integration",
        Deadline::after(Duration::from_secs(120)),
    )
}

/// The simulated client
pub fn chat_app(options: SimOptions) -> MockEngine {
    let engine = MockEngine::new();
    let state: Shared = Arc::new(Mutex::new(SimState::default()));

    shell(&engine, options);
    composer(&engine, &state);
    message_actions(&engine, &state, options);
    pinned_messages(&engine, &state);
    direct_messages(&engine, &state);
    clans(&engine);
    clan_settings(&engine);
    profile(&engine, &state);
    engine
}

fn shell(engine: &MockEngine, options: SimOptions) {
    engine.edit(|dom| {
        dom.insert(node("app.ready"));
        dom.insert(node("clan.sidebar"));
        dom.insert(node("clan.sidebar.item").with_text("QA Clan"));
        dom.insert(node("clan.create.button"));
        dom.insert(node("clan_settings.button"));
        dom.insert(node("channel.list.item").with_text("general"));
        dom.insert(node("chat.direct_message.button"));
        dom.insert(node("chat.direct_message.chat_list").hidden());
        dom.insert(node("chat.direct_message.create").hidden());
        dom.insert(node("chat.message.list"));
        dom.insert(node("chat.mention.input"));
        dom.insert(node("chat.pinned.button"));
        dom.insert(node("user_settings.button"));
        dom.insert(node("onboarding.checklist"));
        dom.insert(node("onboarding.task").with_text("Send your first message"));
        dom.insert(node("onboarding.task").with_text("Invite your friends"));

        for (key, label) in ACTIONS.iter().zip(ACTION_LABELS) {
            if options.without_pin && *key == "chat.message.action.pin" {
                continue;
            }
            dom.insert(node(key).with_text(label).hidden());
        }
        if options.actions_behind_more {
            dom.insert(node("chat.message.toolbar.more").hidden());
        }
    });

    engine.on_navigate(|dom, url| {
        let in_dms = url.contains("/chat/direct");
        dom.set_visible(&e2e("chat.direct_message.chat_list"), in_dms);
        dom.set_visible(&e2e("chat.direct_message.create"), in_dms);
    });
}

fn composer(engine: &MockEngine, state: &Shared) {
    let st = Arc::clone(state);
    engine.on_press(e2e("chat.mention.input"), "Enter", move |dom, input| {
        let text = value_of(dom, input);
        if text.trim().is_empty() {
            return;
        }
        if let Some(el) = dom.get_mut(input) {
            el.value.clear();
        }
        remove_keys(dom, &["chat.message.reply_preview"]);
        let mut s = st.lock().unwrap();
        if let Some(name) = s.open_conversation.clone() {
            s.conversations.entry(name).or_default().push(text.clone());
        }
        render_message(dom, &mut s, text);
        if !s.first_message_sent {
            s.first_message_sent = true;
            dom.schedule(Duration::from_millis(200), |dom| {
                dom.insert(node("onboarding.task.done").with_text("Send your first message"));
            });
        }
    });
}

fn message_actions(engine: &MockEngine, state: &Shared, options: SimOptions) {
    let st = Arc::clone(state);
    engine.on_action(ActionKind::Hover, e2e("chat.message.item"), move |dom, ev| {
        st.lock().unwrap().hovered_item = Some(ev.node);
        if options.actions_behind_more {
            dom.set_visible(&e2e("chat.message.toolbar.more"), true);
        } else {
            for key in ACTIONS {
                dom.set_visible(&e2e(key), true);
            }
        }
    });

    engine.on_click(e2e("chat.message.toolbar.more"), |dom| {
        for key in ACTIONS {
            dom.set_visible(&e2e(key), true);
        }
    });

    let st = Arc::clone(state);
    engine.on_click(e2e("chat.message.action.pin"), move |dom| {
        hide_actions(dom);
        let mut s = st.lock().unwrap();
        if let Some(item) = s.hovered_item {
            let text = text_of(dom, item);
            s.pinned.push(text);
        }
    });

    let st = Arc::clone(state);
    engine.on_click(e2e("chat.message.action.edit"), move |dom| {
        hide_actions(dom);
        let current = st
            .lock()
            .unwrap()
            .hovered_item
            .map(|item| text_of(dom, item))
            .unwrap_or_default();
        dom.insert(node("chat.message.edit_input").with_value(current));
    });

    let st = Arc::clone(state);
    engine.on_press(e2e("chat.message.edit_input"), "Enter", move |dom, input| {
        let text = value_of(dom, input);
        dom.remove(input);
        let s = st.lock().unwrap();
        let Some(item) = s.hovered_item else { return };
        if let Some((_, content)) = s.messages.iter().find(|(i, _)| *i == item) {
            if let Some(el) = dom.get_mut(*content) {
                el.text = text.clone();
            }
        }
        if let Some(el) = dom.get_mut(item) {
            el.text = text;
        }
    });

    engine.on_click(e2e("chat.message.action.delete"), |dom| {
        hide_actions(dom);
        dom.insert(node("chat.message.delete_confirm").with_text("Delete"));
    });

    let st = Arc::clone(state);
    engine.on_click(e2e("chat.message.delete_confirm"), move |dom| {
        remove_keys(dom, &["chat.message.delete_confirm"]);
        let mut s = st.lock().unwrap();
        let Some(item) = s.hovered_item.take() else { return };
        if let Some(pos) = s.messages.iter().position(|(i, _)| *i == item) {
            let (item, content) = s.messages.remove(pos);
            dom.remove(item);
            dom.remove(content);
        }
    });

    engine.on_click(e2e("chat.message.action.reply"), |dom| {
        hide_actions(dom);
        dom.insert(node("chat.message.reply_preview"));
    });

    engine.on_click(e2e("chat.message.action.react"), |dom| {
        hide_actions(dom);
        dom.insert(node("chat.emoji.search"));
    });

    engine.on_fill(e2e("chat.emoji.search"), |dom, query| {
        remove_keys(dom, &["chat.emoji.item"]);
        dom.insert(node("chat.emoji.item").with_text(query));
    });

    engine.on_action(ActionKind::Click, e2e("chat.emoji.item"), |dom, ev| {
        let emoji = text_of(dom, ev.node);
        remove_keys(dom, &["chat.emoji.search", "chat.emoji.item"]);
        dom.insert(node("chat.message.reaction").with_text(format!("{emoji} 1")));
    });

    let st = Arc::clone(state);
    engine.on_click(e2e("chat.message.action.forward"), move |dom| {
        hide_actions(dom);
        let mut s = st.lock().unwrap();
        s.forwarding = s.hovered_item.map(|item| text_of(dom, item));
        s.forward_target = None;
        dom.insert(node("chat.forward.search"));
        for (name, _) in FORWARD_TARGETS {
            dom.insert(node("chat.forward.target").with_text(name));
        }
        dom.insert(node("chat.forward.send").with_text("Send"));
    });

    let st = Arc::clone(state);
    engine.on_action(ActionKind::Click, e2e("chat.forward.target"), move |dom, ev| {
        st.lock().unwrap().forward_target = Some(text_of(dom, ev.node));
    });

    let st = Arc::clone(state);
    engine.on_click(e2e("chat.forward.send"), move |dom| {
        remove_keys(
            dom,
            &["chat.forward.search", "chat.forward.target", "chat.forward.send"],
        );
        let mut s = st.lock().unwrap();
        let (Some(text), Some(target)) = (s.forwarding.take(), s.forward_target.take()) else {
            return;
        };
        let is_dm = FORWARD_TARGETS.iter().any(|(name, dm)| *name == target && *dm);
        if is_dm && !is_listed(dom, &target) {
            dom.insert(node("chat.direct_message.chat_item").with_text(target.clone()));
        }
        s.conversations.entry(target).or_default().push(text);
    });
}

fn pinned_messages(engine: &MockEngine, state: &Shared) {
    let st = Arc::clone(state);
    engine.on_click(e2e("chat.pinned.button"), move |dom| {
        remove_keys(dom, &["chat.pinned.modal", "chat.pinned.item", "chat.pinned.jump"]);
        dom.insert(node("chat.pinned.modal").with_text("Pinned Messages"));
        for text in &st.lock().unwrap().pinned {
            dom.insert(node("chat.pinned.item").with_text(text.clone()));
        }
        dom.insert(node("chat.pinned.jump").with_text("Jump").hidden());
    });

    let st = Arc::clone(state);
    engine.on_action(ActionKind::Hover, e2e("chat.pinned.item"), move |dom, ev| {
        st.lock().unwrap().jump_target = Some(text_of(dom, ev.node));
        dom.set_visible(&e2e("chat.pinned.jump"), true);
    });

    let st = Arc::clone(state);
    engine.on_click(e2e("chat.pinned.jump"), move |dom| {
        remove_keys(dom, &["chat.pinned.modal", "chat.pinned.item", "chat.pinned.jump"]);
        remove_keys(dom, &["chat.message.highlighted"]);
        if let Some(target) = st.lock().unwrap().jump_target.take() {
            dom.schedule(Duration::from_millis(150), move |dom| {
                dom.insert(node("chat.message.highlighted").with_text(target));
            });
        }
    });
}

fn direct_messages(engine: &MockEngine, state: &Shared) {
    engine.on_click(e2e("chat.direct_message.button"), |dom| {
        dom.set_visible(&e2e("chat.direct_message.chat_list"), true);
        dom.set_visible(&e2e("chat.direct_message.create"), true);
    });

    let st = Arc::clone(state);
    let open_picker = move |dom: &mut MockDom, adding: bool| {
        remove_keys(
            dom,
            &[
                "chat.direct_message.member_search",
                "chat.direct_message.member_item",
                "chat.direct_message.confirm",
            ],
        );
        dom.insert(node("chat.direct_message.member_search"));
        for user in ["qa.bob", "qa.carol", "qa.dave"] {
            dom.insert(node("chat.direct_message.member_item").with_text(user));
        }
        dom.insert(node("chat.direct_message.confirm").with_text("Create"));
        let mut s = st.lock().unwrap();
        s.selected_members.clear();
        s.adding_to_group = adding;
    };
    let open_for_create = open_picker.clone();
    engine.on_click(e2e("chat.direct_message.create"), move |dom| {
        open_for_create(dom, false);
    });
    engine.on_click(e2e("chat.direct_message.add_member"), move |dom| {
        open_picker(dom, true);
    });

    engine.on_fill(e2e("chat.direct_message.member_search"), |dom, query| {
        for id in dom.find(&e2e("chat.direct_message.member_item")) {
            if let Some(el) = dom.get_mut(id) {
                el.visible = el.text.contains(query);
            }
        }
    });

    let st = Arc::clone(state);
    engine.on_action(
        ActionKind::Click,
        e2e("chat.direct_message.member_item"),
        move |dom, ev| {
            let user = text_of(dom, ev.node);
            st.lock().unwrap().selected_members.push(user);
        },
    );

    let st = Arc::clone(state);
    engine.on_click(e2e("chat.direct_message.confirm"), move |dom| {
        remove_keys(
            dom,
            &[
                "chat.direct_message.member_search",
                "chat.direct_message.member_item",
                "chat.direct_message.confirm",
            ],
        );
        let mut s = st.lock().unwrap();
        if s.adding_to_group {
            return;
        }
        let name = s.selected_members.join(", ");
        if s.selected_members.len() > 1 {
            s.groups.push(name.clone());
        }
        if !is_listed(dom, &name) {
            dom.insert(node("chat.direct_message.chat_item").with_text(name.clone()));
        }
        open_conversation(dom, &mut s, name);
    });

    let st = Arc::clone(state);
    engine.on_action(
        ActionKind::Click,
        e2e("chat.direct_message.chat_item"),
        move |dom, ev| {
            let name = text_of(dom, ev.node);
            open_conversation(dom, &mut st.lock().unwrap(), name);
        },
    );

    engine.on_action(
        ActionKind::Click,
        e2e("chat.direct_message.header_name"),
        |dom, ev| {
            let current = text_of(dom, ev.node);
            remove_keys(dom, &["chat.direct_message.rename_input"]);
            dom.insert(node("chat.direct_message.rename_input").with_value(current));
        },
    );

    let st = Arc::clone(state);
    engine.on_press(
        e2e("chat.direct_message.rename_input"),
        "Enter",
        move |dom, input| {
            let new_name = value_of(dom, input);
            dom.remove(input);
            let mut s = st.lock().unwrap();
            let Some(old) = s.open_conversation.clone() else { return };
            for id in dom.find(&e2e("chat.direct_message.chat_item")) {
                if let Some(el) = dom.get_mut(id) {
                    if el.text == old {
                        el.text = new_name.clone();
                    }
                }
            }
            dom.set_text(&e2e("chat.direct_message.header_name"), &new_name);
            if let Some(g) = s.groups.iter_mut().find(|g| **g == old) {
                *g = new_name.clone();
            }
            s.open_conversation = Some(new_name);
        },
    );

    engine.on_click(e2e("chat.direct_message.leave_group"), |dom| {
        dom.insert(node("chat.direct_message.leave_confirm").with_text("Leave"));
    });

    let st = Arc::clone(state);
    engine.on_click(e2e("chat.direct_message.leave_confirm"), move |dom| {
        remove_keys(
            dom,
            &[
                "chat.direct_message.leave_confirm",
                "chat.direct_message.leave_group",
                "chat.direct_message.add_member",
                "chat.direct_message.header_name",
            ],
        );
        let mut s = st.lock().unwrap();
        let Some(name) = s.open_conversation.take() else { return };
        s.groups.retain(|g| *g != name);
        // Leaving removes the conversation a moment later
        dom.schedule(Duration::from_millis(250), move |dom| {
            for id in dom.find(&e2e("chat.direct_message.chat_item")) {
                if text_of(dom, id) == name {
                    dom.remove(id);
                }
            }
        });
    });
}

fn is_listed(dom: &MockDom, name: &str) -> bool {
    dom.find(&e2e("chat.direct_message.chat_item"))
        .into_iter()
        .any(|id| text_of(dom, id) == name)
}

fn render_message(dom: &mut MockDom, s: &mut SimState, text: String) {
    let item = dom.insert(node("chat.message.item").with_text(text.clone()));
    let content = dom.insert(node("chat.message.content").with_text(text));
    s.messages.push((item, content));
}

/// Show the header and message history of the conversation `name`
fn open_conversation(dom: &mut MockDom, s: &mut SimState, name: String) {
    remove_keys(
        dom,
        &[
            "chat.direct_message.header_name",
            "chat.direct_message.add_member",
            "chat.direct_message.leave_group",
            "chat.message.item",
            "chat.message.content",
        ],
    );
    s.messages.clear();
    s.hovered_item = None;
    dom.insert(node("chat.direct_message.header_name").with_text(name.clone()));
    if s.groups.contains(&name) {
        dom.insert(node("chat.direct_message.add_member"));
        dom.insert(node("chat.direct_message.leave_group").with_text("Leave Group"));
    }
    let history = s.conversations.get(&name).cloned().unwrap_or_default();
    for text in history {
        render_message(dom, s, text);
    }
    s.open_conversation = Some(name);
}

fn clans(engine: &MockEngine) {
    engine.on_click(e2e("clan.create.button"), |dom| {
        dom.insert(node("clan.create.name_input"));
        dom.insert(node("clan.create.confirm").with_text("Create"));
    });

    engine.on_click(e2e("clan.create.confirm"), |dom| {
        let name = first(dom, "clan.create.name_input")
            .map(|id| value_of(dom, id))
            .unwrap_or_default();
        remove_keys(dom, &["clan.create.name_input", "clan.create.confirm"]);
        dom.schedule(Duration::from_millis(300), move |dom| {
            dom.insert(node("clan.sidebar.item").with_text(name));
        });
    });
}

fn clan_settings(engine: &MockEngine) {
    engine.on_click(e2e("clan_settings.button"), |dom| {
        for section in ["Overview", "Emoji", "Stickers"] {
            dom.insert(node("clan_settings.sidebar.item").with_text(section));
        }
        dom.insert(node("clan_settings.close"));
    });

    engine.on_click(e2e("clan_settings.upload.button"), |dom| {
        remove_keys(
            dom,
            &["clan_settings.upload.input", "clan_settings.upload.error"],
        );
        dom.insert(node("clan_settings.upload.input"));
    });

    engine.on_action(
        ActionKind::Click,
        e2e("clan_settings.sidebar.item"),
        |dom, ev| {
            let section = text_of(dom, ev.node);
            if section != "Overview" {
                dom.insert(node("clan_settings.upload.button").with_text("Upload"));
            }
        },
    );

    engine.on_action(
        ActionKind::SetFiles,
        e2e("clan_settings.upload.input"),
        |dom, ev| {
            remove_keys(dom, &["clan_settings.upload.error"]);
            let too_big = ev
                .files
                .iter()
                .any(|f| std::fs::metadata(f).map_or(false, |m| m.len() > SIM_UPLOAD_LIMIT));
            if too_big {
                dom.schedule(Duration::from_millis(100), |dom| {
                    dom.insert(
                        node("clan_settings.upload.error")
                            .with_text("Your file is too large. Max size is 1MB."),
                    );
                });
            }
        },
    );

    engine.on_click(e2e("clan_settings.close"), |dom| {
        remove_keys(
            dom,
            &[
                "clan_settings.sidebar.item",
                "clan_settings.upload.button",
                "clan_settings.upload.input",
                "clan_settings.upload.error",
                "clan_settings.close",
            ],
        );
    });
}

fn profile(engine: &MockEngine, state: &Shared) {
    engine.on_click(e2e("user_settings.button"), |dom| {
        if first(dom, "user_settings.profile_tab").is_none() {
            dom.insert(node("user_settings.profile_tab").with_text("Profiles"));
            dom.insert(node("user_settings.avatar.image").with_attr("src", DEFAULT_AVATAR));
            dom.insert(node("user_settings.avatar.input"));
            dom.insert(node("user_settings.save").with_text("Save Changes"));
        }
    });

    let st = Arc::clone(state);
    engine.on_action(
        ActionKind::SetFiles,
        e2e("user_settings.avatar.input"),
        move |_, ev| {
            let name = ev
                .files
                .first()
                .and_then(|f| f.file_name())
                .map(|n| n.to_string_lossy().into_owned());
            st.lock().unwrap().pending_avatar = name;
        },
    );

    let st = Arc::clone(state);
    engine.on_click(e2e("user_settings.save"), move |dom| {
        let Some(file) = st.lock().unwrap().pending_avatar.take() else { return };
        let src = format!("https://cdn.mezon.test/avatar/{file}");
        dom.schedule(Duration::from_millis(200), move |dom| {
            if let Some(id) = first(dom, "user_settings.avatar.image") {
                if let Some(el) = dom.get_mut(id) {
                    el.attrs.insert("src".to_string(), src);
                }
            }
        });
    });
}
