//! Operator console for the consent engine.
//!
//! Parses line-oriented instructions and executes them against a fully
//! wired in-process engine. Used interactively or with a playbook file;
//! see the `consentry` binary.

use anyhow::anyhow;
use tower::Service;

use consentry_core::consent::{
    ConsentCore,
    api::{AdminRequest, AdminResponse},
    infrastructure::model::{AttributeDefinition, Facility, User},
    init_consent_core,
};

/// A single console instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Register a user in the user directory
    User { id: i32, name: String },
    /// Register a facility in the facility directory
    Facility { id: i32, name: String },
    /// Ensure the facility belongs to a hub, creating one if needed
    Register { facility_id: i32 },
    /// Create a hub explicitly; name `-` defaults to the first facility
    Hub { name: Option<String>, facilities: Vec<i32> },
    /// Assign a resource to a user within a facility
    AssignResource { facility_id: i32, user_id: i32, resource_id: i32 },
    /// Assign a service to a resource
    AssignService { resource_id: i32, service_id: i32 },
    /// Declare an attribute a service requires
    RequireAttr { service_id: i32, namespace: String, friendly_name: String },
    CreateConsent { user_id: i32, consent_hub_id: i32 },
    /// Move a consent to GRANTED or REVOKED
    Status { consent_id: i32, status: String },
    DeleteConsent { consent_id: i32 },
    AddFacility { consent_hub_id: i32, facility_id: i32 },
    RemoveFacility { consent_hub_id: i32, facility_id: i32 },
    DeleteHub { consent_hub_id: i32 },
    ShowHub { consent_hub_id: i32 },
    ListConsents { user_id: i32 },
    /// Dump the audit trail
    Audit,
}

fn parse_int(token: &str, what: &str) -> Result<i32, String> {
    token.parse::<i32>().map_err(|_| format!("invalid {what}: {token}"))
}

impl TryFrom<&str> for Instruction {
    type Error = String;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (verb, args) =
            tokens.split_first().ok_or_else(|| "empty instruction".to_string())?;

        let expect = |count: usize| -> Result<(), String> {
            if args.len() == count {
                Ok(())
            } else {
                Err(format!("{verb} expects {count} argument(s), got {}", args.len()))
            }
        };

        match *verb {
            "USER" => {
                expect(2)?;
                Ok(Instruction::User { id: parse_int(args[0], "user id")?, name: args[1].to_string() })
            }
            "FACILITY" => {
                expect(2)?;
                Ok(Instruction::Facility {
                    id: parse_int(args[0], "facility id")?,
                    name: args[1].to_string(),
                })
            }
            "REGISTER" => {
                expect(1)?;
                Ok(Instruction::Register { facility_id: parse_int(args[0], "facility id")? })
            }
            "HUB" => {
                expect(2)?;
                let name = if args[0] == "-" { None } else { Some(args[0].to_string()) };
                let facilities = args[1]
                    .split(',')
                    .map(|token| parse_int(token, "facility id"))
                    .collect::<Result<Vec<i32>, String>>()?;
                Ok(Instruction::Hub { name, facilities })
            }
            "ASSIGN-RESOURCE" => {
                expect(3)?;
                Ok(Instruction::AssignResource {
                    facility_id: parse_int(args[0], "facility id")?,
                    user_id: parse_int(args[1], "user id")?,
                    resource_id: parse_int(args[2], "resource id")?,
                })
            }
            "ASSIGN-SERVICE" => {
                expect(2)?;
                Ok(Instruction::AssignService {
                    resource_id: parse_int(args[0], "resource id")?,
                    service_id: parse_int(args[1], "service id")?,
                })
            }
            "REQUIRE-ATTR" => {
                expect(3)?;
                Ok(Instruction::RequireAttr {
                    service_id: parse_int(args[0], "service id")?,
                    namespace: args[1].to_string(),
                    friendly_name: args[2].to_string(),
                })
            }
            "CREATE-CONSENT" => {
                expect(2)?;
                Ok(Instruction::CreateConsent {
                    user_id: parse_int(args[0], "user id")?,
                    consent_hub_id: parse_int(args[1], "consent hub id")?,
                })
            }
            "STATUS" => {
                expect(2)?;
                Ok(Instruction::Status {
                    consent_id: parse_int(args[0], "consent id")?,
                    status: args[1].to_string(),
                })
            }
            "DELETE-CONSENT" => {
                expect(1)?;
                Ok(Instruction::DeleteConsent { consent_id: parse_int(args[0], "consent id")? })
            }
            "ADD-FACILITY" => {
                expect(2)?;
                Ok(Instruction::AddFacility {
                    consent_hub_id: parse_int(args[0], "consent hub id")?,
                    facility_id: parse_int(args[1], "facility id")?,
                })
            }
            "REMOVE-FACILITY" => {
                expect(2)?;
                Ok(Instruction::RemoveFacility {
                    consent_hub_id: parse_int(args[0], "consent hub id")?,
                    facility_id: parse_int(args[1], "facility id")?,
                })
            }
            "DELETE-HUB" => {
                expect(1)?;
                Ok(Instruction::DeleteHub {
                    consent_hub_id: parse_int(args[0], "consent hub id")?,
                })
            }
            "SHOW-HUB" => {
                expect(1)?;
                Ok(Instruction::ShowHub { consent_hub_id: parse_int(args[0], "consent hub id")? })
            }
            "LIST-CONSENTS" => {
                expect(1)?;
                Ok(Instruction::ListConsents { user_id: parse_int(args[0], "user id")? })
            }
            "AUDIT" => {
                expect(0)?;
                Ok(Instruction::Audit)
            }
            unknown => Err(format!("unknown instruction: {unknown}")),
        }
    }
}

/// Executes instructions against an in-process consent engine.
pub struct ConsoleHandler {
    core: ConsentCore,
}

impl Default for ConsoleHandler {
    fn default() -> Self {
        Self { core: init_consent_core("console") }
    }
}

impl ConsoleHandler {
    pub async fn execute(&mut self, instruction: &Instruction) -> anyhow::Result<()> {
        match instruction.clone() {
            Instruction::User { id, name } => {
                self.core.users.register(User::new(id, &name));
                println!("user {id} ({name}) registered");
            }
            Instruction::Facility { id, name } => {
                self.core.facilities.register(Facility::new(id, &name));
                println!("facility {id} ({name}) registered");
            }
            Instruction::Register { facility_id } => {
                let response =
                    self.core.admin.call(AdminRequest::RegisterFacility { facility_id }).await?;
                if let AdminResponse::ConsentHub(hub) = response {
                    println!("{hub}");
                }
            }
            Instruction::Hub { name, facilities } => {
                let response = self
                    .core
                    .admin
                    .call(AdminRequest::CreateConsentHub {
                        name,
                        enforce_consents: true,
                        facilities,
                    })
                    .await?;
                if let AdminResponse::ConsentHub(hub) = response {
                    println!("{hub}");
                }
            }
            Instruction::AssignResource { facility_id, user_id, resource_id } => {
                self.core.assignments.assign_resource(facility_id, user_id, resource_id);
                println!("resource {resource_id} assigned to user {user_id} in facility {facility_id}");
            }
            Instruction::AssignService { resource_id, service_id } => {
                self.core.assignments.assign_service(resource_id, service_id);
                println!("service {service_id} assigned to resource {resource_id}");
            }
            Instruction::RequireAttr { service_id, namespace, friendly_name } => {
                let attribute = AttributeDefinition::new(&namespace, &friendly_name);
                println!("service {service_id} requires {attribute}");
                self.core.attributes.require_attribute(service_id, attribute);
            }
            Instruction::CreateConsent { user_id, consent_hub_id } => {
                let response = self
                    .core
                    .admin
                    .call(AdminRequest::CreateConsent { user_id, consent_hub_id })
                    .await?;
                if let AdminResponse::Consent(consent) = response {
                    println!("{consent}");
                }
            }
            Instruction::Status { consent_id, status } => {
                let response = self
                    .core
                    .admin
                    .call(AdminRequest::ChangeConsentStatus { consent_id, status })
                    .await?;
                if let AdminResponse::Consent(consent) = response {
                    println!("{consent}");
                }
            }
            Instruction::DeleteConsent { consent_id } => {
                self.core.admin.call(AdminRequest::DeleteConsent { consent_id }).await?;
                println!("consent {consent_id} deleted");
            }
            Instruction::AddFacility { consent_hub_id, facility_id } => {
                let response = self
                    .core
                    .admin
                    .call(AdminRequest::AddFacility { consent_hub_id, facility_id })
                    .await?;
                if let AdminResponse::ConsentHub(hub) = response {
                    println!("{hub}");
                }
            }
            Instruction::RemoveFacility { consent_hub_id, facility_id } => {
                self.core
                    .admin
                    .call(AdminRequest::RemoveFacility { consent_hub_id, facility_id })
                    .await?;
                println!("facility {facility_id} removed from consent hub {consent_hub_id}");
            }
            Instruction::DeleteHub { consent_hub_id } => {
                self.core.admin.call(AdminRequest::DeleteConsentHub { consent_hub_id }).await?;
                println!("consent hub {consent_hub_id} deleted");
            }
            Instruction::ShowHub { consent_hub_id } => {
                let response =
                    self.core.admin.call(AdminRequest::GetConsentHubById { consent_hub_id }).await?;
                if let AdminResponse::ConsentHub(hub) = response {
                    println!("{hub}");
                }
            }
            Instruction::ListConsents { user_id } => {
                let response = self
                    .core
                    .admin
                    .call(AdminRequest::GetConsentsForUser { user_id, status: None })
                    .await?;
                if let AdminResponse::Consents(consents) = response {
                    if consents.is_empty() {
                        println!("no consents for user {user_id}");
                    }
                    for consent in consents {
                        println!("{consent}");
                    }
                }
            }
            Instruction::Audit => {
                for event in self.core.auditer.entries() {
                    println!("{event}");
                }
            }
        }
        Ok(())
    }
}

impl ConsoleHandler {
    /// Parse and execute one line. Blank lines and `#` comments are
    /// skipped.
    pub async fn execute_line(&mut self, line: &str) -> anyhow::Result<()> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }
        let instruction = Instruction::try_from(trimmed).map_err(|e| anyhow!(e))?;
        self.execute(&instruction).await
    }
}
