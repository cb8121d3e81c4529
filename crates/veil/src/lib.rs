#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use veil_image as image;

#[doc(inline)]
pub use veil_imgproc as imgproc;

#[doc(inline)]
pub use veil_io as io;
