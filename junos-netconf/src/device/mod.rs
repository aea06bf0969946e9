//! Junos device knowledge: facts, family classification, and typed
//! reply shapes.

mod facts;
pub mod reply;

pub use facts::DeviceFacts;
pub use reply::{
    ChassisInventoryReply, InterfacesTerseReply, ReplyShape, RouteInformationReply,
    SystemInformation, SystemInformationReply, decode_reply,
};
