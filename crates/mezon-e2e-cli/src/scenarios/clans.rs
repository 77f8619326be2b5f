//! Clan creation

use mezon_e2e::pages::HomePage;
use mezon_e2e::{ensure, Scenario};

use super::{unique_text, Target};

const FEATURE: &str = "clans";

pub(super) fn scenarios(_target: &Target) -> Vec<Scenario> {
    vec![create_clan()]
}

fn create_clan() -> Scenario {
    Scenario::new("create clan", FEATURE, |ctx| async move {
        let home = HomePage::new(&ctx);
        home.open().await?;
        let name = unique_text("e2e clan");
        home.create_clan(&name).await?;
        ensure(
            home.has_clan(&name).await?,
            format!("'{name}' not in the clan sidebar"),
        )
    })
}
