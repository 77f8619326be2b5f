//! Channel messaging: send, edit, delete, reply, react, forward, pin

use mezon_e2e::helpers::MessageHelper;
use mezon_e2e::{ensure, Scenario};

use super::{unique_text, Target};

const FEATURE: &str = "messages";

pub(super) fn scenarios(target: &Target) -> Vec<Scenario> {
    vec![
        send_message(target.clone()),
        edit_message(target.clone()),
        delete_message(target.clone()),
        reply_to_message(target.clone()),
        react_to_message(target.clone()),
        forward_message(target.clone()),
        pin_and_jump(target.clone()),
    ]
}

fn send_message(target: Target) -> Scenario {
    Scenario::new("send message", FEATURE, move |ctx| {
        let target = target.clone();
        async move {
            target.open_channel(&ctx).await?;
            let text = unique_text("hello from e2e");
            let messages = MessageHelper::new(&ctx);
            ensure(
                messages.send_and_verify(&text).await?,
                format!("'{text}' is not the newest message"),
            )
        }
    })
}

fn edit_message(target: Target) -> Scenario {
    Scenario::new("edit message", FEATURE, move |ctx| {
        let target = target.clone();
        async move {
            target.open_channel(&ctx).await?;
            let messages = MessageHelper::new(&ctx);
            messages.send_text(&unique_text("draft")).await?;
            let edited = unique_text("edited");
            messages.edit_last_message(&edited).await?;
            ensure(
                messages.verify_last_message_equals(&edited).await?,
                "edited text not shown",
            )
        }
    })
}

fn delete_message(target: Target) -> Scenario {
    Scenario::new("delete message", FEATURE, move |ctx| {
        let target = target.clone();
        async move {
            target.open_channel(&ctx).await?;
            let messages = MessageHelper::new(&ctx);
            let text = unique_text("to be deleted");
            messages.send_text(&text).await?;
            messages.delete_last_message().await?;
            ensure(
                messages.verify_message_absent(&text).await?,
                format!("'{text}' still shown after delete"),
            )
        }
    })
}

fn reply_to_message(target: Target) -> Scenario {
    Scenario::new("reply to message", FEATURE, move |ctx| {
        let target = target.clone();
        async move {
            target.open_channel(&ctx).await?;
            let messages = MessageHelper::new(&ctx);
            messages.send_text(&unique_text("question")).await?;
            let reply = unique_text("answer");
            messages.reply_to_last_message(&reply).await?;
            ensure(
                messages.verify_last_message_equals(&reply).await?,
                "reply not shown",
            )
        }
    })
}

fn react_to_message(target: Target) -> Scenario {
    Scenario::new("react to message", FEATURE, move |ctx| {
        let target = target.clone();
        async move {
            target.open_channel(&ctx).await?;
            let messages = MessageHelper::new(&ctx);
            messages.send_text(&unique_text("react here")).await?;
            messages.react_to_last_message("thumbsup").await?;
            ensure(
                messages.verify_reaction("thumbsup").await?,
                "reaction not shown",
            )
        }
    })
}

fn forward_message(target: Target) -> Scenario {
    Scenario::new("forward message", FEATURE, move |ctx| {
        let target = target.clone();
        async move {
            target.open_channel(&ctx).await?;
            let peer = target.peer(0)?.to_string();
            let text = unique_text("forward me");
            let messages = MessageHelper::new(&ctx);
            messages.send_text(&text).await?;
            ensure(
                messages.forward_to_dm_and_verify(&peer, &text).await?,
                format!("'{text}' did not arrive in the DM with {peer}"),
            )
        }
    })
}

fn pin_and_jump(target: Target) -> Scenario {
    Scenario::new("pin and jump to message", FEATURE, move |ctx| {
        let target = target.clone();
        async move {
            target.open_channel(&ctx).await?;
            MessageHelper::new(&ctx)
                .pin_and_jump(&unique_text("pinned"))
                .await?;
            Ok(())
        }
    })
    .with_tag("workflow")
}
