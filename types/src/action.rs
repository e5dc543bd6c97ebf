//! Caller-facing and protocol action vocabularies
//!
//! A caller invokes an [`Action`] on a model (or on the client for raw
//! queries). The execution engine only understands the closed
//! [`WireAction`] vocabulary, so every caller action has exactly one wire
//! counterpart.

/// Operation requested by the caller
///
/// # Examples
///
/// ```
/// use quarry_types::{Action, WireAction};
///
/// assert_eq!(Action::Create.to_wire(), WireAction::CreateOne);
/// assert_eq!(Action::Count.to_wire(), WireAction::Aggregate);
/// assert!(Action::QueryRaw.is_raw());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Action {
    FindUnique,
    FindUniqueOrThrow,
    FindFirst,
    FindFirstOrThrow,
    FindMany,
    Count,
    Create,
    CreateMany,
    CreateManyAndReturn,
    Update,
    UpdateMany,
    Upsert,
    Delete,
    DeleteMany,
    Aggregate,
    GroupBy,
    ExecuteRaw,
    QueryRaw,
    RunCommandRaw,
    FindRaw,
    AggregateRaw,
}

/// Operation name understood by the execution engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum WireAction {
    FindUnique,
    FindUniqueOrThrow,
    FindFirst,
    FindFirstOrThrow,
    FindMany,
    CreateOne,
    CreateMany,
    CreateManyAndReturn,
    UpdateOne,
    UpdateMany,
    UpsertOne,
    DeleteOne,
    DeleteMany,
    Aggregate,
    GroupBy,
    ExecuteRaw,
    QueryRaw,
    RunCommandRaw,
    FindRaw,
    AggregateRaw,
}

impl Action {
    /// Every caller action, in declaration order
    pub const ALL: [Action; 21] = [
        Action::FindUnique,
        Action::FindUniqueOrThrow,
        Action::FindFirst,
        Action::FindFirstOrThrow,
        Action::FindMany,
        Action::Count,
        Action::Create,
        Action::CreateMany,
        Action::CreateManyAndReturn,
        Action::Update,
        Action::UpdateMany,
        Action::Upsert,
        Action::Delete,
        Action::DeleteMany,
        Action::Aggregate,
        Action::GroupBy,
        Action::ExecuteRaw,
        Action::QueryRaw,
        Action::RunCommandRaw,
        Action::FindRaw,
        Action::AggregateRaw,
    ];

    /// Maps the caller action onto the protocol vocabulary
    #[must_use]
    pub const fn to_wire(&self) -> WireAction {
        match self {
            Action::FindUnique => WireAction::FindUnique,
            Action::FindUniqueOrThrow => WireAction::FindUniqueOrThrow,
            Action::FindFirst => WireAction::FindFirst,
            Action::FindFirstOrThrow => WireAction::FindFirstOrThrow,
            Action::FindMany => WireAction::FindMany,
            Action::Count | Action::Aggregate => WireAction::Aggregate,
            Action::Create => WireAction::CreateOne,
            Action::CreateMany => WireAction::CreateMany,
            Action::CreateManyAndReturn => WireAction::CreateManyAndReturn,
            Action::Update => WireAction::UpdateOne,
            Action::UpdateMany => WireAction::UpdateMany,
            Action::Upsert => WireAction::UpsertOne,
            Action::Delete => WireAction::DeleteOne,
            Action::DeleteMany => WireAction::DeleteMany,
            Action::GroupBy => WireAction::GroupBy,
            Action::ExecuteRaw => WireAction::ExecuteRaw,
            Action::QueryRaw => WireAction::QueryRaw,
            Action::RunCommandRaw => WireAction::RunCommandRaw,
            Action::FindRaw => WireAction::FindRaw,
            Action::AggregateRaw => WireAction::AggregateRaw,
        }
    }

    /// Returns `true` for engine-native passthrough actions
    ///
    /// Raw actions carry an empty selection and never consult the
    /// relation graph.
    #[inline]
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        matches!(
            self,
            Action::ExecuteRaw
                | Action::QueryRaw
                | Action::RunCommandRaw
                | Action::FindRaw
                | Action::AggregateRaw
        )
    }

    /// Parse an action from its caller-facing name
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_types::Action;
    ///
    /// assert_eq!(Action::parse("findMany"), Some(Action::FindMany));
    /// assert_eq!(Action::parse("create"), Some(Action::Create));
    /// assert_eq!(Action::parse("createOne"), None);
    /// ```
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == s)
    }

    /// Get the caller-facing action name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::FindUnique => "findUnique",
            Action::FindUniqueOrThrow => "findUniqueOrThrow",
            Action::FindFirst => "findFirst",
            Action::FindFirstOrThrow => "findFirstOrThrow",
            Action::FindMany => "findMany",
            Action::Count => "count",
            Action::Create => "create",
            Action::CreateMany => "createMany",
            Action::CreateManyAndReturn => "createManyAndReturn",
            Action::Update => "update",
            Action::UpdateMany => "updateMany",
            Action::Upsert => "upsert",
            Action::Delete => "delete",
            Action::DeleteMany => "deleteMany",
            Action::Aggregate => "aggregate",
            Action::GroupBy => "groupBy",
            Action::ExecuteRaw => "executeRaw",
            Action::QueryRaw => "queryRaw",
            Action::RunCommandRaw => "runCommandRaw",
            Action::FindRaw => "findRaw",
            Action::AggregateRaw => "aggregateRaw",
        }
    }
}

impl WireAction {
    /// Get the protocol action name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            WireAction::FindUnique => "findUnique",
            WireAction::FindUniqueOrThrow => "findUniqueOrThrow",
            WireAction::FindFirst => "findFirst",
            WireAction::FindFirstOrThrow => "findFirstOrThrow",
            WireAction::FindMany => "findMany",
            WireAction::CreateOne => "createOne",
            WireAction::CreateMany => "createMany",
            WireAction::CreateManyAndReturn => "createManyAndReturn",
            WireAction::UpdateOne => "updateOne",
            WireAction::UpdateMany => "updateMany",
            WireAction::UpsertOne => "upsertOne",
            WireAction::DeleteOne => "deleteOne",
            WireAction::DeleteMany => "deleteMany",
            WireAction::Aggregate => "aggregate",
            WireAction::GroupBy => "groupBy",
            WireAction::ExecuteRaw => "executeRaw",
            WireAction::QueryRaw => "queryRaw",
            WireAction::RunCommandRaw => "runCommandRaw",
            WireAction::FindRaw => "findRaw",
            WireAction::AggregateRaw => "aggregateRaw",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::fmt::Display for WireAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::parse(s).ok_or(ActionParseError)
    }
}

/// Error returned when parsing an unknown action name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionParseError;

impl core::fmt::Display for ActionParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("unknown action")
    }
}

impl std::error::Error for ActionParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_to_wire() {
        assert_eq!(Action::Create.to_wire(), WireAction::CreateOne);
        assert_eq!(Action::Update.to_wire(), WireAction::UpdateOne);
        assert_eq!(Action::Upsert.to_wire(), WireAction::UpsertOne);
        assert_eq!(Action::Delete.to_wire(), WireAction::DeleteOne);
        assert_eq!(Action::Count.to_wire(), WireAction::Aggregate);
        assert_eq!(Action::FindMany.to_wire(), WireAction::FindMany);
        assert_eq!(Action::QueryRaw.to_wire(), WireAction::QueryRaw);
    }

    #[test]
    fn test_action_parse() {
        for action in Action::ALL {
            assert_eq!(Action::parse(action.as_str()), Some(action));
        }
        assert_eq!("upsert".parse::<Action>(), Ok(Action::Upsert));
        assert_eq!("upsertOne".parse::<Action>(), Err(ActionParseError));
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn test_action_is_raw() {
        let raw: Vec<_> = Action::ALL.into_iter().filter(Action::is_raw).collect();
        assert_eq!(
            raw,
            [
                Action::ExecuteRaw,
                Action::QueryRaw,
                Action::RunCommandRaw,
                Action::FindRaw,
                Action::AggregateRaw
            ]
        );
    }

    #[test]
    fn test_action_display() {
        assert_eq!(format!("{}", Action::GroupBy), "groupBy");
        assert_eq!(format!("{}", WireAction::UpsertOne), "upsertOne");
    }
}
