//! Page objects for the Mezon web client.
//!
//! Each page wraps a [`TestContext`](crate::context::TestContext) and exposes
//! the candidate lists and composite actions of one screen or overlay.

mod channel;
mod clan_settings;
mod direct_message;
mod home;
mod profile;

pub use channel::ChannelPage;
pub use clan_settings::ClanSettingsPage;
pub use direct_message::DirectMessagePage;
pub use home::HomePage;
pub use profile::ProfilePage;

use crate::catalog;
use crate::selector::CandidateList;

/// Catalog candidates narrowed to elements containing `text`
pub(crate) fn key_with_text(key: &str, text: &str) -> crate::result::E2eResult<CandidateList> {
    Ok(catalog::candidates(key)?.containing_text(text))
}
