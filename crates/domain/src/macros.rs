//! Macro for implementing Display and FromStr for status enums
//!
//! This macro eliminates boilerplate for status enum conversions by providing
//! a single implementation for both Display and FromStr traits. It handles
//! case-insensitive parsing and consistent string representation.
//!
//! # Example
//!
//! ```rust
//! use kiddo_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum DeliveryState {
//!     Queued,
//!     InFlight,
//!     Acked,
//! }
//!
//! impl_domain_status_conversions!(DeliveryState {
//!     Queued => "queued",
//!     InFlight => "in_flight",
//!     Acked => "acked",
//! });
//! ```

/// Implements Display and FromStr traits for status enums
///
/// This macro generates:
/// - Display trait: converts enum variants to lowercase strings
/// - FromStr trait: parses case-insensitive strings to enum variants
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their string
///   representations
///
/// # Features
///
/// - Case-insensitive parsing (e.g., "PENDING", "pending", "Pending" all work)
/// - Consistent lowercase string output
/// - Descriptive error messages with enum name
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum DeliveryState {
        Queued,
        InFlight,
        Acked,
    }

    impl_domain_status_conversions!(DeliveryState {
        Queued => "queued",
        InFlight => "in_flight",
        Acked => "acked",
    });

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(DeliveryState::InFlight.to_string(), "in_flight");
    }

    #[test]
    fn test_fromstr_ignores_case() {
        assert_eq!(DeliveryState::from_str("QUEUED").unwrap(), DeliveryState::Queued);
        assert_eq!(DeliveryState::from_str("In_Flight").unwrap(), DeliveryState::InFlight);
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = DeliveryState::from_str("lost");
        assert!(result.unwrap_err().contains("Invalid DeliveryState: lost"));
    }

    mod crate_result_in_scope {
        #[allow(unused_imports)]
        use crate::Result;

        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Channel {
            Email,
            Sms,
        }

        impl_domain_status_conversions!(Channel {
            Email => "email",
            Sms => "sms",
        });
    }

    #[test]
    fn test_expands_where_crate_result_alias_is_imported() {
        use crate_result_in_scope::Channel;

        assert_eq!(Channel::from_str("SMS").unwrap(), Channel::Sms);
        assert!(Channel::from_str("fax").is_err());
    }

    #[test]
    fn test_roundtrip() {
        for state in [DeliveryState::Queued, DeliveryState::InFlight, DeliveryState::Acked] {
            assert_eq!(DeliveryState::from_str(&state.to_string()).unwrap(), state);
        }
    }
}
