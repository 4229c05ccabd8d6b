use strum_macros::Display;

/// Role ids as carried in the `role` claim of an access token.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
}

impl TryFrom<u8> for Role {
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Role::Admin),
            2 => Ok(Role::Hr),
            3 => Ok(Role::Employee),
            other => Err(other),
        }
    }
}

impl Role {
    /// HR and admins maintain employee records and attendance corrections.
    pub fn manages_people(self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }
}
