//! Directory resolver: contact handles to participant identifiers.

use crate::error::ResolutionError;
use futures::future::join_all;
use huddle_core::PersonId;
use huddle_integration::Platform;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Resolves contacts through the platform directory.
#[derive(Clone)]
pub struct DirectoryResolver {
    platform: Arc<dyn Platform>,
}

impl DirectoryResolver {
    #[must_use]
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    /// Resolves every contact to exactly one person, preserving input order.
    ///
    /// Lookups run concurrently and all of them settle before returning. When
    /// several contacts fail, the error of the earliest one is reported.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty, holds blank or duplicate
    /// contacts, any contact has zero or several directory entries, or two
    /// contacts resolve to the same person.
    #[instrument(skip(self), fields(count = contacts.len()))]
    pub async fn resolve(&self, contacts: &[String]) -> Result<Vec<PersonId>, ResolutionError> {
        validate(contacts)?;

        let lookups = contacts.iter().map(|contact| self.resolve_one(contact));
        let resolved = join_all(lookups)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        ensure_distinct(contacts, &resolved)?;

        debug!(resolved = resolved.len(), "contacts resolved");
        Ok(resolved)
    }

    async fn resolve_one(&self, contact: &str) -> Result<PersonId, ResolutionError> {
        let mut matches = self
            .platform
            .find_people_by_email(contact)
            .await
            .map_err(|source| ResolutionError::Lookup {
                contact: contact.to_string(),
                source,
            })?;

        match matches.len() {
            0 => Err(ResolutionError::NotFound {
                contact: contact.to_string(),
            }),
            1 => Ok(matches.remove(0).id),
            n => Err(ResolutionError::Ambiguous {
                contact: contact.to_string(),
                matches: n,
            }),
        }
    }
}

fn validate(contacts: &[String]) -> Result<(), ResolutionError> {
    if contacts.is_empty() {
        return Err(ResolutionError::NoContacts);
    }

    let mut seen = HashSet::new();
    for (position, contact) in contacts.iter().enumerate() {
        if contact.trim().is_empty() {
            return Err(ResolutionError::BlankContact { position });
        }
        if !seen.insert(contact.to_ascii_lowercase()) {
            return Err(ResolutionError::DuplicateContact {
                contact: contact.clone(),
            });
        }
    }
    Ok(())
}

/// Rejects a person reached through more than one contact, naming the later contact.
fn ensure_distinct(contacts: &[String], resolved: &[PersonId]) -> Result<(), ResolutionError> {
    let mut seen = HashSet::new();
    for (contact, person_id) in contacts.iter().zip(resolved) {
        if !seen.insert(person_id) {
            return Err(ResolutionError::DuplicateParticipant {
                contact: contact.clone(),
                person_id: person_id.clone(),
            });
        }
    }
    Ok(())
}
