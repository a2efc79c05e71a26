//! Command registry.
//!
//! Maps command ids to descriptors and remembers which host object
//! contributed which ids. Registration of one host is all-or-nothing:
//! either every discovered command becomes visible or none does.
//!
//! Hosts are held weakly. Commands of a host that has been dropped are never
//! returned by [`CommandRegistry::lookup`] or [`CommandRegistry::list`].
//! Their entries are reclaimed on the next registration or by
//! [`CommandRegistry::prune_dropped_hosts`].

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::config::{DuplicatePolicy, RegistryConfig};
use crate::error::{RegistryError, Result};
use crate::host::CommandHost;
use crate::metadata::{CommandDescriptor, HostKey};
use crate::scanner::{ScanWarning, scan};

/// A registered command together with its bridge handle.
///
/// Handles are unique for the lifetime of the registry and survive a
/// re-registration of the same host.
#[derive(Debug, Clone)]
pub struct RegisteredCommand {
    /// Numeric handle assigned at registration.
    pub handle: u64,
    /// The command.
    pub descriptor: Arc<CommandDescriptor>,
}

/// Change to the set of registered commands.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A command became available, or its metadata changed.
    Registered(RegisteredCommand),
    /// A command went away.
    Unregistered {
        /// Command id.
        id: String,
        /// Handle the command had.
        handle: u64,
    },
}

struct HostRecord {
    name: String,
    ids: Vec<String>,
    liveness: Weak<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct RegistryState {
    commands: HashMap<String, RegisteredCommand>,
    hosts: HashMap<HostKey, HostRecord>,
    next_handle: u64,
}

impl RegistryState {
    fn allocate_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Drop a host and the commands it still owns; returns them.
    fn remove_host(&mut self, key: HostKey) -> Vec<RegisteredCommand> {
        let Some(record) = self.hosts.remove(&key) else {
            return Vec::new();
        };
        let mut removed = Vec::with_capacity(record.ids.len());
        for id in &record.ids {
            if self.commands.get(id).is_some_and(|c| c.descriptor.host() == key) {
                removed.extend(self.commands.remove(id));
            }
        }
        removed
    }

    fn detach(&mut self, owner: HostKey, id: &str) {
        if let Some(record) = self.hosts.get_mut(&owner) {
            record.ids.retain(|i| i != id);
        }
    }
}

/// Registry of commands contributed by host objects.
pub struct CommandRegistry {
    state: RwLock<RegistryState>,
    policy: DuplicatePolicy,
    events: broadcast::Sender<RegistryEvent>,
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.state.try_read().map(|s| (s.commands.len(), s.hosts.len())).ok();
        f.debug_struct("CommandRegistry")
            .field("command_count", &counts.map_or(0, |c| c.0))
            .field("host_count", &counts.map_or(0, |c| c.1))
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// Create an empty registry with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&RegistryConfig::default())
    }

    /// Create an empty registry.
    #[must_use]
    pub fn with_config(config: &RegistryConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            state: RwLock::new(RegistryState::default()),
            policy: config.duplicate_policy,
            events,
        }
    }

    /// Collision policy in force.
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Scan a host object and register its commands.
    ///
    /// Registering an already-registered host replaces its previous
    /// commands; ids it still declares keep their handles.
    ///
    /// # Errors
    /// Returns `DuplicateCommandId` if another live host owns one of the ids
    /// and the policy is [`DuplicatePolicy::Reject`]. Nothing is registered
    /// in that case.
    ///
    /// # Returns
    /// Warnings for command operations that were skipped as malformed.
    pub async fn register<H: CommandHost>(&self, host: &Arc<H>) -> Result<Vec<ScanWarning>> {
        let report = scan(host);
        let key = HostKey::of(host);
        let host_name = host.host_name();

        debug!(
            host = %host_name,
            key = %key,
            commands = report.descriptors.len(),
            "Registering host"
        );

        let mut state = self.state.write().await;
        self.prune_locked(&mut state);

        if self.policy == DuplicatePolicy::Reject {
            for descriptor in &report.descriptors {
                if let Some(existing) = state.commands.get(descriptor.id()) {
                    let owner = &existing.descriptor;
                    if owner.host() != key && owner.is_live() {
                        warn!(
                            host = %host_name,
                            command_id = %descriptor.id(),
                            owner = %owner.host_name(),
                            "Rejecting registration: command id already registered"
                        );
                        return Err(RegistryError::DuplicateCommandId {
                            id: descriptor.id().to_string(),
                            owner: owner.host_name().to_string(),
                        });
                    }
                }
            }
        }

        let previous: HashMap<String, u64> = state
            .remove_host(key)
            .into_iter()
            .map(|c| (c.descriptor.id().to_string(), c.handle))
            .collect();
        let mut ids = Vec::with_capacity(report.descriptors.len());

        for descriptor in report.descriptors {
            let id = descriptor.id().to_string();

            // Another host's entry: a dropped host, or a takeover under `Replace`.
            if let Some(displaced) = state.commands.remove(&id) {
                let owner = displaced.descriptor.host();
                state.detach(owner, &id);
                if displaced.descriptor.is_live() {
                    warn!(
                        command_id = %id,
                        owner = %displaced.descriptor.host_name(),
                        host = %host_name,
                        "Command replaced in registry"
                    );
                }
                self.emit(RegistryEvent::Unregistered { id: id.clone(), handle: displaced.handle });
            }

            let handle = match previous.get(&id) {
                Some(handle) => *handle,
                None => state.allocate_handle(),
            };
            let entry = RegisteredCommand { handle, descriptor: Arc::new(descriptor) };
            state.commands.insert(id.clone(), entry.clone());
            self.emit(RegistryEvent::Registered(entry));
            ids.push(id);
        }

        let kept: HashSet<&String> = ids.iter().collect();
        for (id, handle) in &previous {
            if !kept.contains(id) {
                self.emit(RegistryEvent::Unregistered { id: id.clone(), handle: *handle });
            }
        }

        info!(
            host = %host_name,
            commands = ids.len(),
            warnings = report.warnings.len(),
            "Host registered"
        );

        let liveness: Weak<dyn Any + Send + Sync> = Arc::downgrade(host) as Weak<H>;
        state.hosts.insert(key, HostRecord { name: host_name, ids, liveness });

        Ok(report.warnings)
    }

    /// Remove every command a host object contributed.
    ///
    /// # Returns
    /// The number of commands removed; zero if the host was not registered.
    pub async fn unregister<H: CommandHost>(&self, host: &Arc<H>) -> usize {
        self.unregister_key(HostKey::of(host)).await
    }

    /// Remove every command contributed by the host with this key.
    pub async fn unregister_key(&self, key: HostKey) -> usize {
        let mut state = self.state.write().await;
        let name = state.hosts.get(&key).map(|r| r.name.clone());
        let removed = state.remove_host(key);

        match name {
            Some(name) => info!(host = %name, commands = removed.len(), "Host unregistered"),
            None => debug!(key = %key, "Attempted to unregister unknown host"),
        }

        for command in &removed {
            self.emit(RegistryEvent::Unregistered {
                id: command.descriptor.id().to_string(),
                handle: command.handle,
            });
        }
        removed.len()
    }

    /// Find a live command by id.
    ///
    /// # Errors
    /// Returns `NotFound` if no command has this id or its host was dropped.
    pub async fn lookup(&self, id: &str) -> Result<Arc<CommandDescriptor>> {
        self.entry(id).await.map(|c| c.descriptor)
    }

    /// Find a live command and its handle by id.
    ///
    /// # Errors
    /// Returns `NotFound` if no command has this id or its host was dropped.
    pub async fn entry(&self, id: &str) -> Result<RegisteredCommand> {
        let state = self.state.read().await;
        match state.commands.get(id) {
            Some(command) if command.descriptor.is_live() => Ok(command.clone()),
            Some(_) => {
                debug!(command_id = %id, "Command belongs to a dropped host");
                Err(RegistryError::NotFound(id.to_string()))
            }
            None => Err(RegistryError::NotFound(id.to_string())),
        }
    }

    /// All live commands, ordered by handle.
    pub async fn list(&self) -> Vec<Arc<CommandDescriptor>> {
        self.entries().await.into_iter().map(|c| c.descriptor).collect()
    }

    /// All live commands with their handles, ordered by handle.
    pub async fn entries(&self) -> Vec<RegisteredCommand> {
        let state = self.state.read().await;
        let mut entries: Vec<RegisteredCommand> =
            state.commands.values().filter(|c| c.descriptor.is_live()).cloned().collect();
        entries.sort_by_key(|c| c.handle);
        entries
    }

    /// Number of live commands.
    pub async fn count(&self) -> usize {
        let state = self.state.read().await;
        state.commands.values().filter(|c| c.descriptor.is_live()).count()
    }

    /// Number of registered host objects, dropped ones included until pruned.
    pub async fn host_count(&self) -> usize {
        self.state.read().await.hosts.len()
    }

    /// Whether a live command has this id.
    pub async fn is_registered(&self, id: &str) -> bool {
        self.entry(id).await.is_ok()
    }

    /// Remove everything.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        let removed = state.commands.len();
        for (id, command) in state.commands.drain() {
            self.emit(RegistryEvent::Unregistered { id, handle: command.handle });
        }
        state.hosts.clear();
        info!(commands = removed, "Registry cleared");
    }

    /// Forget hosts that have been dropped.
    ///
    /// [`CommandRegistry::register`] does this as well.
    ///
    /// # Returns
    /// The number of commands removed.
    pub async fn prune_dropped_hosts(&self) -> usize {
        let mut state = self.state.write().await;
        self.prune_locked(&mut state)
    }

    fn prune_locked(&self, state: &mut RegistryState) -> usize {
        let dropped: Vec<HostKey> = state
            .hosts
            .iter()
            .filter(|(_, record)| record.liveness.strong_count() == 0)
            .map(|(key, _)| *key)
            .collect();

        let mut removed = 0;
        for key in dropped {
            let commands = state.remove_host(key);
            removed += commands.len();
            for command in commands {
                self.emit(RegistryEvent::Unregistered {
                    id: command.descriptor.id().to_string(),
                    handle: command.handle,
                });
            }
        }

        if removed > 0 {
            info!(commands = removed, "Pruned commands of dropped hosts");
        }
        removed
    }

    /// Receive lifecycle events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    // Sent while the state lock is held so subscribers see changes in order.
    fn emit(&self, event: RegistryEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}
