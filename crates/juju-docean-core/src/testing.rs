//! In-memory collaborators for tests
//!
//! Both stubs append to a shared [`Journal`] so tests can assert on call
//! order across the provider and the environment.

use async_trait::async_trait;
use juju_docean_cloud::{
    CloudError, CloudProvider, Image, Instance, InstanceSpec, InstanceStatus, Region, SshKey,
};
use juju_docean_config::{Config, Credentials, WaitConfig};
use juju_docean_env::{EnvError, Environment, EnvironmentStatus, MachineStatus};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::commands::CommandContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    ListInstances,
    GetInstance(u64),
    CreateInstance(String),
    DestroyInstance(u64),
    ListImages,
    ListRegions,
    ListSshKeys,
    Status,
    AddMachine(String),
    TerminateMachines(Vec<String>),
    IsRunning,
    DestroyEnvironment,
    DestroyEnvironmentJenv,
    Bootstrap(String),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<Event>>>);

impl Journal {
    pub fn record(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e == event)
    }
}

pub(crate) fn instance(id: u64, name: &str, ip: Option<&str>) -> Instance {
    Instance {
        id,
        name: name.to_string(),
        size_id: 66,
        image_id: 3240036,
        region_id: 8,
        status: InstanceStatus::Active,
        ip_address: ip.map(str::to_string),
        created_at: None,
    }
}

pub(crate) fn fixture_images() -> Vec<Image> {
    let image = |id, name: &str, slug: Option<&str>| Image {
        id,
        name: name.to_string(),
        slug: slug.map(str::to_string),
        distribution: "Ubuntu".to_string(),
        public: true,
    };
    vec![
        image(3240099, "Ubuntu 14.04 x64", None),
        image(3240036, "Ubuntu 14.04 x64", Some("ubuntu-14-04-x64")),
        image(3240000, "Ubuntu 14.04 x32", Some("ubuntu-14-04-x32")),
        image(1505447, "Ubuntu 12.04.4 x64", Some("ubuntu-12-04-x64")),
        Image {
            id: 1601,
            name: "CentOS 6.5 x64".to_string(),
            slug: Some("centos-6-5-x64".to_string()),
            distribution: "CentOS".to_string(),
            public: true,
        },
    ]
}

#[derive(Default)]
struct ProviderState {
    instances: BTreeMap<u64, Instance>,
    /// Polls seen per created instance
    polls: HashMap<u64, u32>,
    created: u64,
    boot_polls: u32,
    never_ready: bool,
    fail_create: bool,
    fail_destroy: bool,
    panic_on_destroy: bool,
    destroy_delay: Duration,
    in_flight: usize,
    max_in_flight: usize,
    ssh_keys: Vec<SshKey>,
    boot_address: Option<String>,
    /// Destroys report no event id
    silent_destroy: bool,
}

/// Provider whose created instances boot after a fixed number of polls
pub(crate) struct StubProvider {
    journal: Journal,
    state: Mutex<ProviderState>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::with_journal(Journal::default())
    }

    pub fn with_journal(journal: Journal) -> Self {
        let state = ProviderState {
            ssh_keys: vec![SshKey {
                id: 77,
                name: "laptop".to_string(),
            }],
            ..Default::default()
        };
        Self {
            journal,
            state: Mutex::new(state),
        }
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub fn with_instance(self, instance: Instance) -> Self {
        self.state
            .lock()
            .unwrap()
            .instances
            .insert(instance.id, instance);
        self
    }

    /// Report "new" for this many polls before turning active
    pub fn with_boot_polls(self, polls: u32) -> Self {
        self.state.lock().unwrap().boot_polls = polls;
        self
    }

    /// Address every booted instance reports instead of 10.0.0.x
    pub fn with_boot_address(self, address: &str) -> Self {
        self.state.lock().unwrap().boot_address = Some(address.to_string());
        self
    }

    pub fn never_ready(self) -> Self {
        self.state.lock().unwrap().never_ready = true;
        self
    }

    pub fn failing_create(self) -> Self {
        self.state.lock().unwrap().fail_create = true;
        self
    }

    pub fn failing_destroy(self) -> Self {
        self.state.lock().unwrap().fail_destroy = true;
        self
    }

    pub fn panicking_destroy(self) -> Self {
        self.state.lock().unwrap().panic_on_destroy = true;
        self
    }

    pub fn without_destroy_events(self) -> Self {
        self.state.lock().unwrap().silent_destroy = true;
        self
    }

    pub fn with_destroy_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().destroy_delay = delay;
        self
    }

    pub fn without_ssh_keys(self) -> Self {
        self.state.lock().unwrap().ssh_keys.clear();
        self
    }

    pub fn instance_ids(&self) -> Vec<u64> {
        self.state.lock().unwrap().instances.keys().copied().collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }
}

#[async_trait]
impl CloudProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn list_instances(&self) -> juju_docean_cloud::Result<Vec<Instance>> {
        self.journal.record(Event::ListInstances);
        Ok(self.state.lock().unwrap().instances.values().cloned().collect())
    }

    async fn get_instance(&self, id: u64) -> juju_docean_cloud::Result<Instance> {
        self.journal.record(Event::GetInstance(id));
        let mut state = self.state.lock().unwrap();
        let boot_polls = state.boot_polls;
        let never_ready = state.never_ready;
        let boot_address = state.boot_address.clone();

        let polls = state.polls.get_mut(&id).map(|p| {
            *p += 1;
            *p
        });
        let instance = state
            .instances
            .get_mut(&id)
            .ok_or(CloudError::InstanceNotFound(id))?;

        if !never_ready && polls.is_some_and(|p| p > boot_polls) {
            instance.status = InstanceStatus::Active;
            instance.ip_address =
                Some(boot_address.unwrap_or_else(|| format!("10.0.0.{}", 4 + id - 1000)));
        }
        Ok(instance.clone())
    }

    async fn create_instance(&self, spec: &InstanceSpec) -> juju_docean_cloud::Result<Instance> {
        self.journal.record(Event::CreateInstance(spec.name.clone()));
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(CloudError::Api {
                status: 422,
                message: "You specified an invalid size for Droplet creation.".to_string(),
            });
        }

        state.created += 1;
        let id = 1000 + state.created;
        let instance = Instance {
            id,
            name: spec.name.clone(),
            size_id: spec.size_id,
            image_id: spec.image_id,
            region_id: spec.region_id,
            status: InstanceStatus::New,
            ip_address: None,
            created_at: None,
        };
        state.instances.insert(id, instance.clone());
        state.polls.insert(id, 0);
        Ok(instance)
    }

    async fn destroy_instance(&self, id: u64) -> juju_docean_cloud::Result<Option<u64>> {
        self.journal.record(Event::DestroyInstance(id));
        let delay = {
            let mut state = self.state.lock().unwrap();
            if state.panic_on_destroy {
                drop(state);
                panic!("destroy exploded for {}", id);
            }
            if state.fail_destroy {
                return Err(CloudError::Api {
                    status: 500,
                    message: "destroy refused".to_string(),
                });
            }
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.destroy_delay
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.in_flight -= 1;
        state
            .instances
            .remove(&id)
            .ok_or(CloudError::InstanceNotFound(id))?;
        Ok((!state.silent_destroy).then_some(id + 5000))
    }

    async fn list_images(&self) -> juju_docean_cloud::Result<Vec<Image>> {
        self.journal.record(Event::ListImages);
        Ok(fixture_images())
    }

    async fn list_regions(&self) -> juju_docean_cloud::Result<Vec<Region>> {
        self.journal.record(Event::ListRegions);
        Ok(vec![Region {
            id: 8,
            name: "New York 3".to_string(),
            slug: "nyc3".to_string(),
        }])
    }

    async fn list_ssh_keys(&self) -> juju_docean_cloud::Result<Vec<SshKey>> {
        self.journal.record(Event::ListSshKeys);
        Ok(self.state.lock().unwrap().ssh_keys.clone())
    }
}

#[derive(Default)]
struct EnvState {
    machines: BTreeMap<String, MachineStatus>,
    next_machine: u32,
    running: bool,
    fail_add: bool,
    unlisted: bool,
    fail_terminate: bool,
    fail_bootstrap: bool,
}

/// Environment that tracks machines in memory
pub(crate) struct StubEnvironment {
    journal: Journal,
    state: Mutex<EnvState>,
}

fn command_failed(command: &str) -> EnvError {
    EnvError::CommandFailed {
        command: format!("juju {}", command),
        transcript: "ERROR stubbed failure".to_string(),
    }
}

impl StubEnvironment {
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            state: Mutex::new(EnvState {
                next_machine: 1,
                ..Default::default()
            }),
        }
    }

    pub fn with_machine(self, machine_id: &str, dns_name: Option<&str>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.machines.insert(
                machine_id.to_string(),
                MachineStatus {
                    dns_name: dns_name.map(str::to_string),
                    instance_id: dns_name.map(|d| format!("manual:{}", d)),
                    agent_state: Some("started".to_string()),
                    series: Some("precise".to_string()),
                },
            );
            if let Ok(n) = machine_id.parse::<u32>() {
                state.next_machine = state.next_machine.max(n + 1);
            }
        }
        self
    }

    pub fn running(self) -> Self {
        self.state.lock().unwrap().running = true;
        self
    }

    pub fn failing_add(self) -> Self {
        self.state.lock().unwrap().fail_add = true;
        self
    }

    /// Accept add-machine but never list the new machine
    pub fn unlisted(self) -> Self {
        self.state.lock().unwrap().unlisted = true;
        self
    }

    pub fn failing_terminate(self) -> Self {
        self.state.lock().unwrap().fail_terminate = true;
        self
    }

    pub fn failing_bootstrap(self) -> Self {
        self.state.lock().unwrap().fail_bootstrap = true;
        self
    }

    pub fn machine_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().machines.keys().cloned().collect()
    }
}

#[async_trait]
impl Environment for StubEnvironment {
    fn name(&self) -> &str {
        "prod"
    }

    async fn status(&self) -> juju_docean_env::Result<EnvironmentStatus> {
        self.journal.record(Event::Status);
        Ok(EnvironmentStatus {
            environment: Some("prod".to_string()),
            machines: self.state.lock().unwrap().machines.clone(),
        })
    }

    async fn add_machine(
        &self,
        address: &str,
        _ssh_key: Option<&str>,
    ) -> juju_docean_env::Result<()> {
        self.journal.record(Event::AddMachine(address.to_string()));
        let mut state = self.state.lock().unwrap();
        if state.fail_add {
            return Err(command_failed("add-machine"));
        }
        if !state.unlisted {
            let id = state.next_machine.to_string();
            state.next_machine += 1;
            state.machines.insert(
                id,
                MachineStatus {
                    dns_name: Some(address.to_string()),
                    ..Default::default()
                },
            );
        }
        Ok(())
    }

    async fn terminate_machines(&self, machine_ids: &[String]) -> juju_docean_env::Result<()> {
        self.journal
            .record(Event::TerminateMachines(machine_ids.to_vec()));
        let mut state = self.state.lock().unwrap();
        if state.fail_terminate {
            return Err(command_failed("terminate-machine"));
        }
        for id in machine_ids {
            state.machines.remove(id);
        }
        Ok(())
    }

    async fn is_running(&self) -> juju_docean_env::Result<bool> {
        self.journal.record(Event::IsRunning);
        Ok(self.state.lock().unwrap().running)
    }

    async fn destroy_environment(&self) -> juju_docean_env::Result<()> {
        self.journal.record(Event::DestroyEnvironment);
        let mut state = self.state.lock().unwrap();
        state.machines.clear();
        state.running = false;
        Ok(())
    }

    async fn destroy_environment_jenv(&self) -> juju_docean_env::Result<()> {
        self.journal.record(Event::DestroyEnvironmentJenv);
        self.state.lock().unwrap().running = false;
        Ok(())
    }

    async fn bootstrap(&self, host: &str) -> juju_docean_env::Result<()> {
        self.journal.record(Event::Bootstrap(host.to_string()));
        let mut state = self.state.lock().unwrap();
        if state.fail_bootstrap {
            return Err(command_failed("bootstrap"));
        }
        state.machines.insert(
            "0".to_string(),
            MachineStatus {
                dns_name: Some(host.to_string()),
                ..Default::default()
            },
        );
        state.running = true;
        Ok(())
    }
}

pub(crate) const ENVIRONMENTS_YAML: &str = r#"
environments:
  prod:
    type: manual
    bootstrap-host:
    bootstrap-user: root
"#;

/// Config with short waits, no ssh probing and no settle delay
pub(crate) fn test_config(juju_home: &Path) -> Config {
    let credentials =
        Credentials::from_parts(Some("cid".to_string()), Some("key".to_string())).unwrap();
    let mut config = Config::new("prod", juju_home, credentials);
    config.provisioning_wait = WaitConfig::new(Duration::from_secs(60), Duration::from_secs(5));
    config.registration_wait = WaitConfig::new(Duration::from_secs(30), Duration::from_secs(5));
    config.wait_for_ssh = false;
    config.settle_delay = Duration::ZERO;
    config
}

/// Juju home with a valid environments.yaml for "prod"
pub(crate) fn juju_home() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("environments.yaml"), ENVIRONMENTS_YAML).unwrap();
    dir
}

pub(crate) fn context(
    config: Config,
    provider: Arc<StubProvider>,
    env: Arc<StubEnvironment>,
) -> CommandContext {
    CommandContext::new(Arc::new(config), provider, env)
}
