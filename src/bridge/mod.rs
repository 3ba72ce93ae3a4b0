//! Value-granularity bridges to the outside world: the JSON tree used by
//! clients and the wire protocol's protobuf `Datum` message.

pub mod json;
pub mod proto;
