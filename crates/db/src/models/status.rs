//! Status enums mirroring the SMALLINT lookup tables.
//!
//! Discriminants are the seeded row ids; keep them in sync with
//! `20261001000000_create_lookup_tables.sql` and the constants in
//! `backoffice_core`.

/// SMALLINT id of a status lookup row.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up the variant for a database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( x if x == $val => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Whether a business subdomain currently resolves.
    SubdomainStatus {
        Active = 1,
        Expired = 2,
        Suspended = 3,
    }
}

define_status_enum! {
    /// Who can see a subscription plan.
    PlanVisibility {
        Public = 1,
        Private = 2,
    }
}

define_status_enum! {
    PaymentStatus {
        Pending = 1,
        Completed = 2,
        Failed = 3,
        Refunded = 4,
    }
}

define_status_enum! {
    OrderStatus {
        Pending = 1,
        Confirmed = 2,
        Preparing = 3,
        Ready = 4,
        Delivered = 5,
        Cancelled = 6,
        Rejected = 7,
    }
}

define_status_enum! {
    AttendanceStatus {
        Present = 1,
        Absent = 2,
        Late = 3,
        Excused = 4,
    }
}

define_status_enum! {
    /// Shared by attendance sessions and their rows.
    FinalizationStatus {
        Draft = 1,
        Final = 2,
    }
}

define_status_enum! {
    AttendanceType {
        Qr = 1,
        Manual = 2,
    }
}

define_status_enum! {
    ScoreSessionStatus {
        Draft = 1,
        Submitted = 2,
        Approved = 3,
        Rejected = 4,
    }
}

define_status_enum! {
    SurveyStatus {
        Active = 1,
        Inactive = 2,
    }
}
