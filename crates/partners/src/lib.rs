//! Partners domain module (the companies services are performed for).
//!
//! Deterministic, event-sourced business rules only. Uniqueness of names and
//! INNs spans many partners and is checked by the caller against the partner
//! directory read model.

pub mod partner;

pub use partner::{
    Partner, PartnerCommand, PartnerDetails, PartnerEvent, PartnerId, PartnerRegistered,
    PartnerType, PartnerUpdated, RegisterPartner, UpdatePartner,
};
