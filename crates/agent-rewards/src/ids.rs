use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Travel agency organisation.
    AgencyId
);
uuid_id!(
    /// Individual travel agent.
    AgentId
);
uuid_id!(
    /// Pending or reviewed request to join the program.
    ApplicationId
);
uuid_id!(HotelId);
uuid_id!(RoomTypeId);
uuid_id!(BookingId);
uuid_id!(RedemptionId);
uuid_id!(
    /// Identity issued by the external authentication provider.
    IdentityId
);
