pub mod packet;
pub mod sap_class;
pub mod traffic_source;
