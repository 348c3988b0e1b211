#![forbid(unsafe_code)]

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, SessionIdError> {
        let value = value.into();
        validate_session_id(&value)?;
        Ok(Self(value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionIdError {
    Empty,
    TooLong,
    InvalidFirstChar,
    InvalidChar,
}

impl SessionIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "session id must not be empty",
            Self::TooLong => "session id is too long",
            Self::InvalidFirstChar => "session id must start with an ascii letter or digit",
            Self::InvalidChar => "session id may only contain ascii letters, digits, '.', '_' and '-'",
        }
    }
}

fn validate_session_id(value: &str) -> Result<(), SessionIdError> {
    if value.is_empty() {
        return Err(SessionIdError::Empty);
    }
    if value.len() > 128 {
        return Err(SessionIdError::TooLong);
    }
    let Some(first) = value.chars().next() else {
        return Err(SessionIdError::Empty);
    };
    if !first.is_ascii_alphanumeric() {
        return Err(SessionIdError::InvalidFirstChar);
    }
    for ch in value.chars().skip(1) {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            continue;
        }
        return Err(SessionIdError::InvalidChar);
    }
    Ok(())
}

/// Content hash of an artifact's bytes: 64 lowercase hex chars (SHA-256).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, DigestIdError> {
        let value = value.into();
        Ok(Self(validate_digest(&value)?))
    }
}

/// Hash identity of an operation node, same 64-hex shape as [`ArtifactId`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, DigestIdError> {
        let value = value.into();
        Ok(Self(validate_digest(&value)?))
    }

    pub(crate) fn from_digest(digest: String) -> Self {
        debug_assert!(validate_digest(&digest).is_ok());
        Self(digest)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DigestIdError {
    WrongLength,
    NotHex,
}

impl DigestIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::WrongLength => "id must be exactly 64 hex characters",
            Self::NotHex => "id must contain only hex characters",
        }
    }
}

fn validate_digest(value: &str) -> Result<String, DigestIdError> {
    if value.len() != 64 {
        return Err(DigestIdError::WrongLength);
    }
    if !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DigestIdError::NotHex);
    }
    Ok(value.to_ascii_lowercase())
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpType(String);

impl OpType {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, TagError> {
        let value = value.into();
        validate_tag(&value, 64)?;
        Ok(Self(value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArtifactKind(String);

impl ArtifactKind {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, TagError> {
        let value = value.into();
        validate_tag(&value, 32)?;
        Ok(Self(value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArtifactFormat(String);

impl ArtifactFormat {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, TagError> {
        let value = value.into();
        validate_tag(&value, 32)?;
        Ok(Self(value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagError {
    Empty,
    TooLong,
    InvalidChar,
}

impl TagError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "tag must not be empty",
            Self::TooLong => "tag is too long",
            Self::InvalidChar => "tag may only contain ascii lowercase letters, digits and '_'",
        }
    }
}

// Shared shape for op_type / kind / format: short lowercase machine tags
// ("upload", "sql", "table", "parquet", ...). The set is open; the charset is not.
fn validate_tag(value: &str, max_len: usize) -> Result<(), TagError> {
    if value.is_empty() {
        return Err(TagError::Empty);
    }
    if value.len() > max_len {
        return Err(TagError::TooLong);
    }
    for ch in value.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            continue;
        }
        return Err(TagError::InvalidChar);
    }
    Ok(())
}
