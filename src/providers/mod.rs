pub mod bcm_provider;

pub use bcm_provider::BcmProvider;
