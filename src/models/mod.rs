/// Decoded code text and its symbology
pub mod decode_result;
/// Media device descriptors
pub mod device;
/// Resolved records: structured roast data or raw fallback text
pub mod record;

pub use decode_result::{DecodeResult, QR_CODE_FORMAT};
pub use device::{DeviceDescriptor, DeviceKind};
pub use record::{FallbackKind, FallbackRecord, RECOGNIZED_FIELDS, ResolvedRecord, StructuredRecord};
