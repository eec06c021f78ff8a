mod gate;
mod guard;
mod role;
mod session;

pub use gate::{require, AdminOnly, AnyRole, Permission, Tallier, VoterOnly};
pub use guard::{AuthFailure, Authorized};
pub use role::Role;
pub use session::{AuthContext, SessionAuthenticator};
