pub mod geocoding;
pub mod open_meteo;

pub use geocoding::{Geocoder, ResolvedCoords};
pub use open_meteo::OpenMeteoClient;
