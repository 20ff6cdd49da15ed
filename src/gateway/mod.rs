// Gateway-wide shared state; keep per-connection code in frontend.
pub mod directory;
pub mod pool;
pub mod registry;
pub mod router;

pub use directory::{Directory, StaticDirectory};
pub use pool::{PeerError, PeerLinkPool, PeerStatus};
pub use registry::{Registration, Session, SessionLease, SessionRegistry};
pub use router::{RouteError, RouteOutcome, Router};
