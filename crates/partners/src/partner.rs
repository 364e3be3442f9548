use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use costbook_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use costbook_events::Event;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("valid email regex"));

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartnerId(pub AggregateId);

impl PartnerId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PartnerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Legal form of a partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartnerType {
    #[serde(rename = "ИП")]
    IndividualEntrepreneur,
    #[serde(rename = "ООО")]
    LimitedLiability,
    #[serde(rename = "ЗАО")]
    ClosedJointStock,
}

impl PartnerType {
    pub const ALL: [PartnerType; 3] = [
        PartnerType::IndividualEntrepreneur,
        PartnerType::LimitedLiability,
        PartnerType::ClosedJointStock,
    ];

    /// Abbreviation as printed on documents.
    pub fn label(self) -> &'static str {
        match self {
            PartnerType::IndividualEntrepreneur => "ИП",
            PartnerType::LimitedLiability => "ООО",
            PartnerType::ClosedJointStock => "ЗАО",
        }
    }
}

impl core::fmt::Display for PartnerType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

impl core::str::FromStr for PartnerType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PartnerType::ALL
            .into_iter()
            .find(|t| t.label() == s.trim())
            .ok_or_else(|| DomainError::validation(format!("unknown partner type '{s}'")))
    }
}

/// Everything a partner record carries besides its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerDetails {
    pub partner_type: PartnerType,
    pub name: String,
    pub manager: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub inn: String,
    pub rating: i32,
}

impl PartnerDetails {
    /// Checks field formats and returns a copy with text fields trimmed.
    pub fn validated(&self) -> Result<PartnerDetails, DomainError> {
        let name = text("name", &self.name, 100)?;
        let manager = text("manager", &self.manager, 100)?;
        let email = text("email", &self.email, 100)?;
        let phone = text("phone", &self.phone, 20)?;
        let address = text("address", &self.address, 200)?;
        let inn = text("inn", &self.inn, 20)?;

        if !EMAIL.is_match(&email) {
            return Err(DomainError::validation(format!("malformed email '{email}'")));
        }
        if !matches!(inn.len(), 10 | 12) || !inn.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation("inn must contain 10 or 12 digits"));
        }
        if self.rating < 0 {
            return Err(DomainError::validation("rating must not be negative"));
        }

        Ok(PartnerDetails {
            partner_type: self.partner_type,
            name,
            manager,
            email,
            phone,
            address,
            inn,
            rating: self.rating,
        })
    }
}

fn text(field: &str, value: &str, max_chars: usize) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Aggregate root: Partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partner {
    id: PartnerId,
    details: Option<PartnerDetails>,
    version: u64,
}

impl Partner {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: PartnerId) -> Self {
        Self {
            id,
            details: None,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> PartnerId {
        self.id
    }

    /// `None` until the partner is registered.
    pub fn details(&self) -> Option<&PartnerDetails> {
        self.details.as_ref()
    }

    pub fn is_registered(&self) -> bool {
        self.details.is_some()
    }
}

impl AggregateRoot for Partner {
    type Id = PartnerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPartner {
    pub partner_id: PartnerId,
    pub details: PartnerDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Replaces every detail of an existing partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePartner {
    pub partner_id: PartnerId,
    pub details: PartnerDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartnerCommand {
    RegisterPartner(RegisterPartner),
    UpdatePartner(UpdatePartner),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerRegistered {
    pub partner_id: PartnerId,
    pub details: PartnerDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerUpdated {
    pub partner_id: PartnerId,
    pub details: PartnerDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartnerEvent {
    PartnerRegistered(PartnerRegistered),
    PartnerUpdated(PartnerUpdated),
}

impl Event for PartnerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartnerEvent::PartnerRegistered(_) => "partners.partner.registered",
            PartnerEvent::PartnerUpdated(_) => "partners.partner.updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PartnerEvent::PartnerRegistered(e) => e.occurred_at,
            PartnerEvent::PartnerUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Partner {
    type Command = PartnerCommand;
    type Event = PartnerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PartnerEvent::PartnerRegistered(e) => {
                self.id = e.partner_id;
                self.details = Some(e.details.clone());
            }
            PartnerEvent::PartnerUpdated(e) => {
                self.details = Some(e.details.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PartnerCommand::RegisterPartner(cmd) => self.handle_register(cmd),
            PartnerCommand::UpdatePartner(cmd) => self.handle_update(cmd),
        }
    }
}

impl Partner {
    fn ensure_partner_id(&self, partner_id: PartnerId) -> Result<(), DomainError> {
        if self.id != partner_id {
            return Err(DomainError::invariant("partner_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterPartner) -> Result<Vec<PartnerEvent>, DomainError> {
        if self.is_registered() {
            return Err(DomainError::conflict("partner already exists"));
        }
        let details = cmd.details.validated()?;

        Ok(vec![PartnerEvent::PartnerRegistered(PartnerRegistered {
            partner_id: cmd.partner_id,
            details,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdatePartner) -> Result<Vec<PartnerEvent>, DomainError> {
        if !self.is_registered() {
            return Err(DomainError::not_found("partner"));
        }
        self.ensure_partner_id(cmd.partner_id)?;
        let details = cmd.details.validated()?;

        Ok(vec![PartnerEvent::PartnerUpdated(PartnerUpdated {
            partner_id: cmd.partner_id,
            details,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_partner_id() -> PartnerId {
        PartnerId::new(AggregateId::new())
    }

    fn details() -> PartnerDetails {
        PartnerDetails {
            partner_type: PartnerType::LimitedLiability,
            name: "Stroymontazh".to_string(),
            manager: "Ivanov I.I.".to_string(),
            email: "office@stroymontazh.ru".to_string(),
            phone: "+7 495 123 45 67".to_string(),
            address: "Moscow, Tverskaya 1".to_string(),
            inn: "7701234567".to_string(),
            rating: 7,
        }
    }

    fn registered(partner_id: PartnerId) -> Partner {
        let mut partner = Partner::empty(partner_id);
        let events = partner
            .handle(&PartnerCommand::RegisterPartner(RegisterPartner {
                partner_id,
                details: details(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        partner.apply(&events[0]);
        partner
    }

    #[test]
    fn register_emits_partner_registered() {
        let partner_id = test_partner_id();
        let partner = Partner::empty(partner_id);
        let mut input = details();
        input.name = "  Stroymontazh  ".to_string();

        let events = partner
            .handle(&PartnerCommand::RegisterPartner(RegisterPartner {
                partner_id,
                details: input,
                occurred_at: Utc::now(),
            }))
            .unwrap();

        assert_eq!(events.len(), 1);
        match &events[0] {
            PartnerEvent::PartnerRegistered(e) => {
                assert_eq!(e.partner_id, partner_id);
                assert_eq!(e.details, details());
            }
            other => panic!("expected PartnerRegistered, got {other:?}"),
        }
    }

    #[test]
    fn register_twice_is_a_conflict() {
        let partner_id = test_partner_id();
        let partner = registered(partner_id);
        let err = partner
            .handle(&PartnerCommand::RegisterPartner(RegisterPartner {
                partner_id,
                details: details(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn blank_fields_are_rejected() {
        for field in ["name", "manager", "email", "phone", "address", "inn"] {
            let mut d = details();
            match field {
                "name" => d.name = "   ".into(),
                "manager" => d.manager = String::new(),
                "email" => d.email = String::new(),
                "phone" => d.phone = " ".into(),
                "address" => d.address = String::new(),
                _ => d.inn = String::new(),
            }
            let err = d.validated().unwrap_err();
            assert!(matches!(err, DomainError::Validation(msg) if msg.contains(field)));
        }
    }

    #[test]
    fn email_format_is_checked() {
        for bad in ["no-at-sign", "a@b", "a b@c.ru", "@host.ru"] {
            let mut d = details();
            d.email = bad.to_string();
            assert!(d.validated().is_err(), "{bad} should be rejected");
        }
        let mut d = details();
        d.email = "first.last-1@mail.example.ru".to_string();
        assert!(d.validated().is_ok());
    }

    #[test]
    fn inn_needs_ten_or_twelve_digits() {
        for (inn, ok) in [
            ("7701234567", true),
            ("770123456789", true),
            ("77012345678", false),
            ("770123456", false),
            ("77012345ab", false),
        ] {
            let mut d = details();
            d.inn = inn.to_string();
            assert_eq!(d.validated().is_ok(), ok, "inn {inn}");
        }
    }

    #[test]
    fn negative_rating_is_rejected() {
        let mut d = details();
        d.rating = -1;
        assert!(d.validated().is_err());
        d.rating = 0;
        assert!(d.validated().is_ok());
    }

    #[test]
    fn update_replaces_details() {
        let partner_id = test_partner_id();
        let mut partner = registered(partner_id);

        let mut changed = details();
        changed.partner_type = PartnerType::ClosedJointStock;
        changed.rating = 10;
        let events = partner
            .handle(&PartnerCommand::UpdatePartner(UpdatePartner {
                partner_id,
                details: changed.clone(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        partner.apply(&events[0]);

        assert_eq!(partner.details(), Some(&changed));
        assert_eq!(partner.version(), 2);
    }

    #[test]
    fn update_of_unknown_partner_is_not_found() {
        let partner_id = test_partner_id();
        let err = Partner::empty(partner_id)
            .handle(&PartnerCommand::UpdatePartner(UpdatePartner {
                partner_id,
                details: details(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::not_found("partner"));
    }

    #[test]
    fn update_with_wrong_id_is_rejected() {
        let partner = registered(test_partner_id());
        let err = partner
            .handle(&PartnerCommand::UpdatePartner(UpdatePartner {
                partner_id: test_partner_id(),
                details: details(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn partner_type_uses_document_labels() {
        assert_eq!(
            serde_json::to_string(&PartnerType::IndividualEntrepreneur).unwrap(),
            "\"ИП\""
        );
        let parsed: PartnerType = serde_json::from_str("\"ЗАО\"").unwrap();
        assert_eq!(parsed, PartnerType::ClosedJointStock);
        assert_eq!("ООО".parse::<PartnerType>().unwrap(), PartnerType::LimitedLiability);
        assert!("АО".parse::<PartnerType>().is_err());
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let partner_id = test_partner_id();
        let partner = registered(partner_id);
        let before = partner.clone();

        let cmd = PartnerCommand::UpdatePartner(UpdatePartner {
            partner_id,
            details: details(),
            occurred_at: Utc::now(),
        });
        let first = partner.handle(&cmd).unwrap();
        let second = partner.handle(&cmd).unwrap();

        assert_eq!(partner, before);
        assert_eq!(first, second);
    }
}
