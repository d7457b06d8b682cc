pub mod email;
pub mod html;
pub mod redirect;

#[cfg(test)]
mod tests;

pub use email::extract_emails;
pub use html::{SelectorPolicy, dedup_by_url, extract_links};
pub use redirect::decode_tracking_link;
