pub mod settings;

pub use settings::{
    AppSettings, AuthSettings, DatabaseSettings, DeliverySettings, GatewaySettings, Settings,
    VapidSettings,
};
