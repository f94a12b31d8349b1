//! Sample entities shared by the unit tests

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::Entity;
use crate::search::{Analyze, EmbeddedField, SearchDescriptor, SearchField};
use crate::storage::{MemoryContext, MemorySession, SessionContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: Option<String>,
    pub name: String,
}

impl Entity for Permission {
    const ENTITY_NAME: &'static str = "Permission";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn search_descriptor() -> &'static SearchDescriptor {
        static DESCRIPTOR: SearchDescriptor = SearchDescriptor {
            fields: &[SearchField::new("name", Analyze::Analyzed)],
            embedded: &[],
        };
        &DESCRIPTOR
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: Option<String>,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Role {
    pub fn new(name: &str, code: &str) -> Self {
        Self {
            id: None,
            name: name.into(),
            code: code.into(),
            permissions: Vec::new(),
        }
    }
}

impl Entity for Role {
    const ENTITY_NAME: &'static str = "Role";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn search_descriptor() -> &'static SearchDescriptor {
        static DESCRIPTOR: SearchDescriptor = SearchDescriptor {
            fields: &[
                SearchField::new("name", Analyze::Analyzed),
                SearchField::new("code", Analyze::NotAnalyzed),
            ],
            embedded: &[EmbeddedField {
                name: "permissions",
                descriptor: Permission::search_descriptor,
            }],
        };
        &DESCRIPTOR
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Option<String>,
    pub bio: String,
    pub secret: String,
}

impl Entity for Profile {
    const ENTITY_NAME: &'static str = "Profile";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn search_descriptor() -> &'static SearchDescriptor {
        static DESCRIPTOR: SearchDescriptor = SearchDescriptor {
            fields: &[
                SearchField::new("bio", Analyze::Analyzed),
                SearchField::new("secret", Analyze::No),
            ],
            embedded: &[],
        };
        &DESCRIPTOR
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub level: i64,
    #[serde(default)]
    pub roles: Vec<Role>,
    pub profile: Option<Profile>,
}

impl User {
    pub fn new(name: &str, level: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: None,
            level,
            roles: Vec::new(),
            profile: None,
        }
    }

    pub fn with_id(id: &str, name: &str, level: i64) -> Self {
        let mut user = Self::new(name, level);
        user.id = Some(id.into());
        user
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.into());
        self
    }
}

impl Entity for User {
    const ENTITY_NAME: &'static str = "User";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn search_descriptor() -> &'static SearchDescriptor {
        static DESCRIPTOR: SearchDescriptor = SearchDescriptor {
            fields: &[
                SearchField::new("name", Analyze::Analyzed),
                SearchField::new("email", Analyze::NotAnalyzed),
                SearchField::new("level", Analyze::NotAnalyzed),
            ],
            embedded: &[
                EmbeddedField {
                    name: "roles",
                    descriptor: Role::search_descriptor,
                },
                EmbeddedField {
                    name: "profile",
                    descriptor: Profile::search_descriptor,
                },
            ],
        };
        &DESCRIPTOR
    }
}

/// An entity type that declares no search fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Option<String>,
    pub text: String,
}

impl Note {
    pub fn new(text: &str) -> Self {
        Self {
            id: None,
            text: text.into(),
        }
    }
}

impl Entity for Note {
    const ENTITY_NAME: &'static str = "Note";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

/// Fresh in-memory session plus a context over it
pub fn memory_context() -> (Arc<MemorySession>, Arc<dyn SessionContext>) {
    let session = Arc::new(MemorySession::new());
    let context: Arc<dyn SessionContext> = Arc::new(MemoryContext::new(session.clone()));
    (session, context)
}
