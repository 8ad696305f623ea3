//! Session handling for the Folio API.
//!
//! The refresh credential lives in the [`CredentialStore`]; the session cookie
//! lives in the transport's cookie jar. When a request comes back 401 the
//! pipeline asks the [`RefreshCoordinator`] to renew the session through the
//! [`RefreshExchange`], unless the [`BootstrapGuard`] exempts the call. A
//! failed renewal evicts the credential and consults the [`RedirectPolicy`].

pub mod coordinator;
pub mod guard;
pub mod redirect;
pub mod refresh;
pub mod store;

pub use coordinator::{Recovery, RefreshCoordinator};
pub use guard::{BootstrapGuard, ExemptCall};
pub use redirect::{HeadlessNavigator, Navigation, Navigator, RedirectPolicy};
pub use refresh::{HttpRefreshExchange, RefreshExchange};
pub use store::CredentialStore;
