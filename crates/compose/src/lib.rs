//! Quorum Compose - validated builders for ledger operations
//!
//! Every builder is a pure function from intent parameters to one
//! `Operation`. Validation failures come back as `ComposeError`, each with a
//! stable dotted code (`invalid.deleteOffer`, `missing.issuer`, ...).

pub mod error;
pub mod offer;
pub mod operations;
pub mod options;

pub use error::ComposeError;
pub use offer::{manage_offer, offer_description, parse_offer_id, PRICE_SCALE};
pub use operations::{allow_trust, change_trust, create_account, payment, resolve_asset};
pub use options::{
    parse_flag, parse_flag_operation, set_options_flags, set_options_home_domain,
    set_options_signer, set_options_weights, AccountFlag, FlagOperation, MAX_HOME_DOMAIN,
};
