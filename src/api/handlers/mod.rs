pub mod coupon;
pub use self::coupon::coupon;

pub mod health;
pub use self::health::health;

pub mod redirect;
pub use self::redirect::redirect;

pub mod users;
pub use self::users::authentication_details;
