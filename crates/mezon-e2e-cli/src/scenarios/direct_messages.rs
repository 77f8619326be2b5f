//! Direct and group conversations

use mezon_e2e::helpers::{DirectMessageHelper, MessageHelper};
use mezon_e2e::pages::HomePage;
use mezon_e2e::{ensure, Scenario};

use super::{unique_text, Target};

const FEATURE: &str = "direct_messages";

pub(super) fn scenarios(target: &Target) -> Vec<Scenario> {
    vec![direct_message(target.clone()), group_lifecycle(target.clone())]
}

fn direct_message(target: Target) -> Scenario {
    Scenario::new("direct message a peer", FEATURE, move |ctx| {
        let target = target.clone();
        async move {
            let peer = target.peer(0)?.to_string();
            HomePage::new(&ctx).open().await?;
            let dms = DirectMessageHelper::new(&ctx);
            dms.open_dm_list().await?;
            dms.create_dm(&peer).await?;
            ensure(dms.verify_dm_listed(&peer).await?, format!("no DM with {peer}"))?;

            let text = unique_text("hi");
            ensure(
                MessageHelper::new(&ctx).send_and_verify(&text).await?,
                "DM message not shown",
            )
        }
    })
}

fn group_lifecycle(target: Target) -> Scenario {
    Scenario::new("group create rename and leave", FEATURE, move |ctx| {
        let target = target.clone();
        async move {
            let first = target.peer(0)?.to_string();
            let second = target.peer(1)?.to_string();
            HomePage::new(&ctx).open().await?;
            let dms = DirectMessageHelper::new(&ctx);
            dms.open_dm_list().await?;
            dms.create_group(&[first.as_str(), second.as_str()]).await?;

            let name = unique_text("e2e group");
            dms.rename_group(&name).await?;
            ensure(dms.verify_group_name(&name).await?, "group name not updated")?;

            dms.leave_group(&name).await?;
            ensure(
                dms.verify_dm_not_listed(&name).await?,
                format!("'{name}' still listed after leaving"),
            )
        }
    })
    .with_tag("workflow")
}
