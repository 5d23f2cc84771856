//! In-memory stores backing the protected endpoints.
//!
//! Persistence is out of scope; these exist so the authorization paths run
//! against real lookups.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{PoisonError, RwLock},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use spendwise_auth::{GroupMembershipResolver, Identity, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0} does not exist")]
    DoesNotExist(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("All the emails are invalid")]
    NoValidEmails,

    #[error("Group will be empty after removing members")]
    WouldEmptyGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl UserRecord {
    /// Identity to embed in session tokens for this user.
    pub fn identity(&self) -> Identity {
        Identity::new(&self.username, &self.email, self.role).with_id(self.id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    #[serde(rename = "type")]
    pub kind: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
    pub members: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub date: DateTime<Utc>,
}

/// A transaction joined with the colour of its category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub date: DateTime<Utc>,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAddition {
    pub group: Group,
    pub already_in_group: Vec<String>,
    pub members_not_found: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRemoval {
    pub group: Group,
    pub not_in_group: Vec<String>,
    pub members_not_found: Vec<String>,
}

#[derive(Debug, Default)]
pub struct UserDirectory {
    inner: RwLock<BTreeMap<String, UserRecord>>,
}

impl UserDirectory {
    pub fn register(
        &self,
        username: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Result<UserRecord, StoreError> {
        let username = username.into();
        let email = email.into();
        let mut users = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if users.contains_key(&username) {
            return Err(StoreError::AlreadyExists(format!("user '{username}'")));
        }
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::AlreadyExists(format!("email '{email}'")));
        }

        let record = UserRecord {
            id: Uuid::now_v7(),
            username: username.clone(),
            email,
            role,
        };
        users.insert(username, record.clone());
        Ok(record)
    }

    pub fn get(&self, username: &str) -> Option<UserRecord> {
        let users = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        users.get(username).cloned()
    }

    pub fn by_email(&self, email: &str) -> Option<UserRecord> {
        let users = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        users.values().find(|u| u.email == email).cloned()
    }

    pub fn all(&self) -> Vec<UserRecord> {
        let users = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        users.values().cloned().collect()
    }
}

#[derive(Debug, Default)]
pub struct CategoryStore {
    inner: RwLock<BTreeMap<String, Category>>,
}

impl CategoryStore {
    pub fn create(&self, kind: String, color: String) -> Result<Category, StoreError> {
        let mut categories = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if categories.contains_key(&kind) {
            return Err(StoreError::AlreadyExists(format!("category '{kind}'")));
        }

        let category = Category { kind: kind.clone(), color };
        categories.insert(kind, category.clone());
        Ok(category)
    }

    pub fn get(&self, kind: &str) -> Option<Category> {
        let categories = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        categories.get(kind).cloned()
    }

    pub fn all(&self) -> Vec<Category> {
        let categories = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        categories.values().cloned().collect()
    }
}

/// Transactions keyed by their time-ordered id.
#[derive(Debug, Default)]
pub struct TransactionStore {
    inner: RwLock<BTreeMap<Uuid, Transaction>>,
}

impl TransactionStore {
    pub fn record(&self, username: String, amount: f64, kind: String) -> Transaction {
        let transaction = Transaction {
            id: Uuid::now_v7(),
            username,
            amount,
            kind,
            date: Utc::now(),
        };
        let mut transactions = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        transactions.insert(transaction.id, transaction.clone());
        transaction
    }

    /// Remove `id` if it belongs to `username`.
    pub fn remove_owned(&self, id: Uuid, username: &str) -> Option<Transaction> {
        let mut transactions = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if transactions.get(&id)?.username != username {
            return None;
        }
        transactions.remove(&id)
    }

    pub fn matching<F>(&self, keep: F) -> Vec<Transaction>
    where
        F: Fn(&Transaction) -> bool,
    {
        let transactions = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        transactions.values().filter(|t| keep(t)).cloned().collect()
    }
}

#[derive(Debug, Default)]
pub struct GroupStore {
    inner: RwLock<BTreeMap<String, Group>>,
}

impl GroupStore {
    pub fn create(&self, name: String, members: BTreeSet<String>) -> Result<Group, StoreError> {
        let mut groups = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if groups.contains_key(&name) {
            return Err(StoreError::AlreadyExists(format!("group '{name}'")));
        }

        let group = Group { name: name.clone(), members };
        groups.insert(name, group.clone());
        Ok(group)
    }

    pub fn get(&self, name: &str) -> Option<Group> {
        let groups = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        groups.get(name).cloned()
    }

    pub fn all(&self) -> Vec<Group> {
        let groups = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        groups.values().cloned().collect()
    }

    /// Add `emails` to group `name`.
    ///
    /// Unregistered emails and emails already in any group are skipped and
    /// reported; at least one email must be added.
    pub fn add_members<F>(
        &self,
        name: &str,
        emails: BTreeSet<String>,
        is_registered: F,
    ) -> Result<GroupAddition, StoreError>
    where
        F: Fn(&str) -> bool,
    {
        let mut groups = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !groups.contains_key(name) {
            return Err(StoreError::NotFound("Group"));
        }

        let mut already_in_group = Vec::new();
        let mut members_not_found = Vec::new();
        let mut valid = Vec::new();
        for email in emails {
            if !is_registered(&email) {
                members_not_found.push(email);
            } else if groups.values().any(|g| g.members.contains(&email)) {
                already_in_group.push(email);
            } else {
                valid.push(email);
            }
        }

        if valid.is_empty() {
            return Err(StoreError::NoValidEmails);
        }

        let group = groups.get_mut(name).ok_or(StoreError::NotFound("Group"))?;
        group.members.extend(valid);
        Ok(GroupAddition {
            group: group.clone(),
            already_in_group,
            members_not_found,
        })
    }

    /// Remove `emails` from group `name`; the group must keep at least one member.
    pub fn remove_members<F>(
        &self,
        name: &str,
        emails: BTreeSet<String>,
        is_registered: F,
    ) -> Result<GroupRemoval, StoreError>
    where
        F: Fn(&str) -> bool,
    {
        let mut groups = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let group = groups.get_mut(name).ok_or(StoreError::NotFound("Group"))?;

        let mut not_in_group = Vec::new();
        let mut members_not_found = Vec::new();
        let mut valid = Vec::new();
        for email in emails {
            if !is_registered(&email) {
                members_not_found.push(email);
            } else if !group.members.contains(&email) {
                not_in_group.push(email);
            } else {
                valid.push(email);
            }
        }

        if valid.is_empty() {
            return Err(StoreError::NoValidEmails);
        }
        if group.members.len() <= valid.len() {
            return Err(StoreError::WouldEmptyGroup);
        }

        for email in &valid {
            group.members.remove(email);
        }
        Ok(GroupRemoval {
            group: group.clone(),
            not_in_group,
            members_not_found,
        })
    }
}

impl GroupMembershipResolver for GroupStore {
    fn member_emails(&self, group_name: &str) -> Option<BTreeSet<String>> {
        self.get(group_name).map(|g| g.members)
    }
}

/// Shared application state handed to handlers via `Extension`.
#[derive(Debug, Default)]
pub struct AppServices {
    pub users: UserDirectory,
    pub categories: CategoryStore,
    pub groups: GroupStore,
    pub transactions: TransactionStore,
}

impl AppServices {
    /// Seed a user (registration itself is handled elsewhere).
    pub fn register_user(
        &self,
        username: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Result<UserRecord, StoreError> {
        self.users.register(username, email, role)
    }

    pub fn record_transaction(
        &self,
        username: &str,
        amount: f64,
        kind: String,
    ) -> Result<Transaction, StoreError> {
        if self.categories.get(&kind).is_none() {
            return Err(StoreError::DoesNotExist("Category"));
        }
        if self.users.get(username).is_none() {
            return Err(StoreError::DoesNotExist("User"));
        }
        Ok(self.transactions.record(username.to_string(), amount, kind))
    }

    pub fn all_transactions(&self) -> Vec<TransactionView> {
        self.views(self.transactions.matching(|_| true))
    }

    /// Transactions of `username`, optionally restricted to one category.
    pub fn transactions_of(
        &self,
        username: &str,
        category: Option<&str>,
    ) -> Result<Vec<TransactionView>, StoreError> {
        if self.users.get(username).is_none() {
            return Err(StoreError::DoesNotExist("User"));
        }
        if let Some(kind) = category {
            if self.categories.get(kind).is_none() {
                return Err(StoreError::DoesNotExist("Category"));
            }
        }

        Ok(self.views(self.transactions.matching(|t| {
            t.username == username && category.is_none_or(|kind| t.kind == kind)
        })))
    }

    /// Transactions of every registered member of `group`.
    pub fn group_transactions(&self, group: &Group) -> Vec<TransactionView> {
        let usernames: BTreeSet<String> = group
            .members
            .iter()
            .filter_map(|email| self.users.by_email(email))
            .map(|user| user.username)
            .collect();

        self.views(self.transactions.matching(|t| usernames.contains(&t.username)))
    }

    pub fn delete_transaction(&self, username: &str, id: &str) -> Result<(), StoreError> {
        if self.users.get(username).is_none() {
            return Err(StoreError::DoesNotExist("User"));
        }

        let id = Uuid::parse_str(id).map_err(|_| StoreError::NotFound("Transaction"))?;
        self.transactions
            .remove_owned(id, username)
            .map(|_| ())
            .ok_or(StoreError::NotFound("Transaction"))
    }

    pub fn add_to_group(
        &self,
        name: &str,
        emails: BTreeSet<String>,
    ) -> Result<GroupAddition, StoreError> {
        self.groups
            .add_members(name, emails, |email| self.users.by_email(email).is_some())
    }

    pub fn remove_from_group(
        &self,
        name: &str,
        emails: BTreeSet<String>,
    ) -> Result<GroupRemoval, StoreError> {
        self.groups
            .remove_members(name, emails, |email| self.users.by_email(email).is_some())
    }

    /// Join transactions with category colours; a transaction whose category
    /// is gone is left out.
    fn views(&self, transactions: Vec<Transaction>) -> Vec<TransactionView> {
        transactions
            .into_iter()
            .filter_map(|t| {
                let color = self.categories.get(&t.kind)?.color;
                Some(TransactionView {
                    id: t.id,
                    username: t.username,
                    amount: t.amount,
                    kind: t.kind,
                    date: t.date,
                    color,
                })
            })
            .collect()
    }
}
