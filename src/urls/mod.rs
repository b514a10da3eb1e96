// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod credentials;
mod normalize;
mod parts;

pub use credentials::{Credentials, add_credentials, extract_credentials, strip_credentials};
pub use normalize::normalize_feed_url;
