#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use tangent_lie as lie;

#[doc(inline)]
pub use tangent_autodiff as autodiff;

#[doc(inline)]
pub use tangent_cost as cost;
