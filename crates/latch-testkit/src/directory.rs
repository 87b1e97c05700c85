use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use latch_types::TargetRef;
use serde::{Deserialize, Serialize};

/// Type tag for user targets.
pub const USER_TAG: &str = "directory.user";
/// Type tag for group targets.
pub const GROUP_TAG: &str = "directory.group";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
}

#[derive(Default)]
struct Inner {
    users: BTreeMap<String, User>,
    groups: BTreeMap<String, Group>,
}

/// Tiny in-memory stand-in for the domain the sample handlers mutate.
/// Cloning shares the underlying state, so a test can keep a handle while
/// the handlers work on the same directory.
#[derive(Clone, Default)]
pub struct Directory {
    inner: Arc<RwLock<Inner>>,
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().unwrap();
        f.debug_struct("Directory")
            .field("users", &inner.users.len())
            .field("groups", &inner.groups.len())
            .finish()
    }
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.inner.write().unwrap().users.insert(user.id.clone(), user);
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.inner.read().unwrap().users.get(id).cloned()
    }

    pub fn remove_user(&self, id: &str) -> Option<User> {
        self.inner.write().unwrap().users.remove(id)
    }

    pub fn username_taken(&self, username: &str) -> bool {
        self.inner
            .read()
            .unwrap()
            .users
            .values()
            .any(|user| user.username == username)
    }

    /// Apply `mutate` to the user with `id`; false if there is no such user.
    pub fn update_user(&self, id: &str, mutate: impl FnOnce(&mut User)) -> bool {
        let mut inner = self.inner.write().unwrap();
        match inner.users.get_mut(id) {
            Some(user) => {
                mutate(user);
                true
            }
            None => false,
        }
    }

    pub fn insert_group(&self, group: Group) {
        self.inner
            .write()
            .unwrap()
            .groups
            .insert(group.id.clone(), group);
    }

    pub fn group(&self, id: &str) -> Option<Group> {
        self.inner.read().unwrap().groups.get(id).cloned()
    }

    pub fn update_group(&self, id: &str, mutate: impl FnOnce(&mut Group)) -> bool {
        let mut inner = self.inner.write().unwrap();
        match inner.groups.get_mut(id) {
            Some(group) => {
                mutate(group);
                true
            }
            None => false,
        }
    }
}

/// Target reference for the user with `id`.
pub fn user_ref(id: &str) -> TargetRef {
    TargetRef::new(USER_TAG, id)
}

/// Target reference for the group with `id`.
pub fn group_ref(id: &str) -> TargetRef {
    TargetRef::new(GROUP_TAG, id)
}
