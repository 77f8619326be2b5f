//! Static selector catalog for the Mezon web client.
//!
//! Every key resolves first through its `data-e2e` attribute query, built by
//! [`format_e2e_selector`]. The table holds only the structural fallbacks
//! for builds that predate the attribute.

use crate::result::{E2eError, E2eResult};
use crate::selector::{Candidate, CandidateList, Selector};

/// Turn a dotted key into its `data-e2e` attribute query.
///
/// `chat.direct_message.chat_list` becomes
/// `[data-e2e="chat-direct_message-chat_list"]`.
#[must_use]
pub fn format_e2e_selector(key: &str) -> String {
    format!("[data-e2e=\"{}\"]", key.replace('.', "-"))
}

type Entry = (&'static str, &'static [&'static str]);

const CATALOG: &[Entry] = &[
    // App shell
    ("app.ready", &["#main-layout", "div.app-layout"]),
    ("clan.sidebar", &["nav[aria-label='Clans']", "div.clan-list"]),
    ("clan.sidebar.item", &["div.clan-list [role='button']", "div.clan-list a"]),
    ("clan.create.button", &["button[aria-label='Create Clan']", r#"div:has-text("Add a Clan")"#]),
    ("clan.create.name_input", &["input[name='clanName']", "input[placeholder*='clan name' i]"]),
    ("clan.create.confirm", &[r#"button:has-text("Create")"#]),
    ("channel.list.item", &["a[href*='/channels/']", "div.channel-list a"]),
    // Messages
    (
        "chat.mention.input",
        &["textarea#editorReactMention", "div[contenteditable='true'][role='textbox']"],
    ),
    ("chat.message.list", &["#scrollLoading", "div[role='log']"]),
    ("chat.message.item", &["div[id^='msg-']", "div.message-container"]),
    ("chat.message.content", &["div[id^='msg-'] .message-text", "div.message-container p"]),
    ("chat.message.context_menu", &["div[role='menu']", "div.contexify"]),
    ("chat.message.toolbar", &["div.message-hover-toolbar", "div[role='toolbar']"]),
    (
        "chat.message.toolbar.more",
        &[
            "div.message-hover-toolbar button[aria-label='More']",
            "div[role='toolbar'] button:last-child",
        ],
    ),
    (
        "chat.message.action.edit",
        &[r#"div[role='menuitem']:has-text("Edit Message")"#, "text=Edit Message"],
    ),
    (
        "chat.message.action.delete",
        &[r#"div[role='menuitem']:has-text("Delete Message")"#, "text=Delete Message"],
    ),
    ("chat.message.action.reply", &[r#"div[role='menuitem']:has-text("Reply")"#, "text=Reply"]),
    (
        "chat.message.action.forward",
        &[r#"div[role='menuitem']:has-text("Forward Message")"#, "text=Forward Message"],
    ),
    (
        "chat.message.action.pin",
        &[r#"div[role='menuitem']:has-text("Pin Message")"#, "text=Pin Message"],
    ),
    (
        "chat.message.action.react",
        &[r#"div[role='menuitem']:has-text("Add Reaction")"#, "button[aria-label='Add Reaction']"],
    ),
    (
        "chat.message.edit_input",
        &["div.message-edit textarea", "textarea[aria-label='Edit message']"],
    ),
    ("chat.message.delete_confirm", &[r#"div[role='dialog'] button:has-text("Delete")"#]),
    ("chat.message.reply_preview", &["div.reply-preview", "div[class*='replied']"]),
    ("chat.message.reaction", &["div.reaction-item", "button[aria-label^='Reaction']"]),
    ("chat.emoji.search", &["input[placeholder*='emoji' i]", "div.emoji-picker input"]),
    ("chat.emoji.item", &["div.emoji-picker button", "button[title^=':']"]),
    (
        "chat.pinned.button",
        &["button[aria-label='Pinned Messages']", "button[title='Pinned Messages']"],
    ),
    (
        "chat.pinned.modal",
        &["div.pinned-messages-modal", r#"div[role='dialog']:has-text("Pinned Messages")"#],
    ),
    ("chat.pinned.item", &["div.pinned-messages-modal div.pinned-item"]),
    ("chat.pinned.jump", &[r#"button:has-text("Jump")"#, "text=Jump"]),
    (
        "chat.message.highlighted",
        &["div[id^='msg-'].highlight", "div.message-container.bg-highlight"],
    ),
    ("chat.forward.search", &["div[role='dialog'] input[type='text']"]),
    ("chat.forward.target", &["div[role='dialog'] li", "div.forward-target"]),
    ("chat.forward.send", &[r#"div[role='dialog'] button:has-text("Send")"#]),
    // Direct messages
    (
        "chat.direct_message.button",
        &["a[href*='/direct/friends']", "div[aria-label='Direct Messages']"],
    ),
    ("chat.direct_message.chat_list", &["div.dm-list", "ul[aria-label='Direct Messages']"]),
    ("chat.direct_message.chat_item", &["div.dm-list a", "ul[aria-label='Direct Messages'] li"]),
    (
        "chat.direct_message.create",
        &["button[aria-label='Create DM']", "button[title='Create DM']"],
    ),
    ("chat.direct_message.member_search", &["div[role='dialog'] input[type='text']"]),
    ("chat.direct_message.member_item", &["div[role='dialog'] label", "div[role='dialog'] li"]),
    (
        "chat.direct_message.confirm",
        &[r#"div[role='dialog'] button:has-text("Create")"#, r#"button:has-text("Create DM")"#],
    ),
    ("chat.direct_message.header_name", &["div.dm-header .name", "header h2"]),
    ("chat.direct_message.rename_input", &["div.dm-header input", "header input[type='text']"]),
    (
        "chat.direct_message.add_member",
        &["button[aria-label='Add Friends to DM']", "button[title='Add Friends to DM']"],
    ),
    (
        "chat.direct_message.leave_group",
        &[r#"div[role='menuitem']:has-text("Leave Group")"#, "text=Leave Group"],
    ),
    ("chat.direct_message.leave_confirm", &[r#"div[role='dialog'] button:has-text("Leave")"#]),
    // Clan settings
    (
        "clan_settings.button",
        &[
            "button[aria-label='Clan Settings']",
            r#"div[role='menuitem']:has-text("Clan Settings")"#,
        ],
    ),
    ("clan_settings.sidebar.item", &["div.settings-sidebar button", "div.settings-sidebar li"]),
    ("clan_settings.upload.button", &[r#"button:has-text("Upload")"#, "label[for^='upload']"]),
    ("clan_settings.upload.input", &["input[type='file']"]),
    ("clan_settings.upload.error", &["div.upload-error", "div[role='alert']"]),
    ("clan_settings.close", &["button[aria-label='Close settings']", "div.settings-close"]),
    // User settings / profile
    (
        "user_settings.button",
        &["button[aria-label='User Settings']", "div.user-panel button:last-child"],
    ),
    (
        "user_settings.profile_tab",
        &[r#"div.settings-sidebar button:has-text("Profiles")"#, "text=Profiles"],
    ),
    ("user_settings.avatar.input", &["input[type='file'][accept*='image']"]),
    ("user_settings.avatar.image", &["div.profile-preview img", "img[alt='avatar']"]),
    ("user_settings.save", &[r#"button:has-text("Save Changes")"#]),
    // Onboarding
    ("onboarding.checklist", &["div.onboarding-tasks", r#"div:has-text("Getting Started")"#]),
    ("onboarding.task", &["div.onboarding-tasks li", "div.onboarding-task"]),
    (
        "onboarding.task.done",
        &["div.onboarding-tasks li.completed", "div.onboarding-task[data-done='true']"],
    ),
];

/// Candidates registered for `key`, in preference order
pub fn candidates(key: &str) -> E2eResult<CandidateList> {
    let fallbacks = fallbacks(key)
        .ok_or_else(|| E2eError::invalid_argument(format!("unknown selector key: {key}")))?;
    let mut list = vec![Candidate::new(Selector::css(format_e2e_selector(key)))];
    for raw in fallbacks {
        list.push(Candidate::parse(raw)?);
    }
    CandidateList::new(list)
}

/// Structural fallbacks registered for `key`, without the `data-e2e` query
#[must_use]
pub fn fallbacks(key: &str) -> Option<&'static [&'static str]> {
    CATALOG.iter().find(|(k, _)| *k == key).map(|(_, c)| *c)
}

/// Every registered key, in table order
pub fn keys() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|(k, _)| *k)
}
