pub mod currency;
pub mod history;
pub mod rates;
pub mod settings;
pub mod state;
