use serde::{Deserialize, Serialize};

/// Portal roles. Every role string crossing a boundary is parsed into this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Admin,
    Student,
    Faculty,
    DeptChair,
    Executive,
    Coordinator,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Student,
        Role::Faculty,
        Role::DeptChair,
        Role::Executive,
        Role::Coordinator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
            Role::Faculty => "faculty",
            Role::DeptChair => "dept_chair",
            Role::Executive => "executive",
            Role::Coordinator => "coordinator",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            "faculty" => Ok(Role::Faculty),
            "dept_chair" | "dept-chair" => Ok(Role::DeptChair),
            "executive" => Ok(Role::Executive),
            "coordinator" => Ok(Role::Coordinator),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}
