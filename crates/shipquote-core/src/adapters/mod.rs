mod static_carrier;
mod ups;

pub use static_carrier::{StaticCarrier, StaticService};
pub use ups::{
    service_code as ups_service_code, service_level as ups_service_level,
    service_name as ups_service_name, ups_carrier_id, UpsCarrier, UpsCredentialFetcher,
};
