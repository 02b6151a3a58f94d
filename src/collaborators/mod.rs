pub mod geocoder;
pub mod payment;

pub use geocoder::{FixedGeocoder, Geocoder, HttpGeocoder};
pub use payment::{AuthorizationResult, PaymentGateway, RefundResult, TestPaymentGateway};
