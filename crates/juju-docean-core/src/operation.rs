//! Machine lifecycle operations
//!
//! Each operation is a short sequential protocol against the provider and
//! the environment. It returns its outcome as a value; nothing here retries
//! or cleans up on the caller's behalf.

use juju_docean_cloud::{CloudError, CloudProvider, Instance, InstanceSpec};
use juju_docean_config::WaitConfig;
use juju_docean_env::{EnvError, Environment, port_open};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{OperationError, RegistrationFailure};
use crate::wait::{WaitError, poll_until, poll_until_deadline};

/// Per-attempt connect timeout when probing sshd
const SSH_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

const SSH_PORT: u16 = 22;

/// Lifecycle of a queued operation. Only the runner moves it forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl OperationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationState::Succeeded | OperationState::Failed)
    }
}

/// Create an instance and wait until it is active with an address
pub struct MachineAdd {
    provider: Arc<dyn CloudProvider>,
    spec: InstanceSpec,
    wait: WaitConfig,
    wait_for_ssh: bool,
    ssh_port: u16,
}

impl MachineAdd {
    pub fn new(provider: Arc<dyn CloudProvider>, spec: InstanceSpec, wait: WaitConfig) -> Self {
        Self {
            provider,
            spec,
            wait,
            wait_for_ssh: false,
            ssh_port: SSH_PORT,
        }
    }

    /// Also wait for sshd on the new address before returning
    pub fn with_ssh_wait(mut self, enabled: bool) -> Self {
        self.wait_for_ssh = enabled;
        self
    }

    pub fn with_ssh_port(mut self, port: u16) -> Self {
        self.ssh_port = port;
        self
    }

    pub fn spec(&self) -> &InstanceSpec {
        &self.spec
    }

    pub async fn run(&self) -> Result<Instance, OperationError> {
        let created = self
            .provider
            .create_instance(&self.spec)
            .await
            .map_err(OperationError::Provisioning)?;
        let instance_id = created.id;
        info!(
            "Launched instance id:{} name:{}, waiting for it to boot",
            instance_id, created.name
        );

        // boot and sshd share one budget
        let started = Instant::now();
        let deadline = started + self.wait.timeout;
        let timed_out = |e: WaitError<CloudError>| match e {
            WaitError::Check(e) => OperationError::Provisioning(e),
            WaitError::TimedOut { waited, .. } => OperationError::ProvisioningTimeout {
                instance_id,
                waited,
            },
        };

        let instance = poll_until_deadline(started, deadline, self.wait.interval, || async move {
            let instance = self.provider.get_instance(instance_id).await?;
            debug!("Instance {} status: {}", instance_id, instance.status);
            Ok::<_, CloudError>(instance.is_ready().then_some(instance))
        })
        .await
        .map_err(timed_out)?;

        if self.wait_for_ssh {
            let address = instance.address().unwrap_or_default();
            let port = self.ssh_port;
            debug!("Waiting for ssh on {}:{}", address, port);
            poll_until_deadline(started, deadline, self.wait.interval, || async move {
                let open = port_open(address, port, SSH_PROBE_TIMEOUT).await;
                Ok::<_, CloudError>(open.then_some(()))
            })
            .await
            .map_err(timed_out)?;
        }

        Ok(instance)
    }
}

/// [`MachineAdd`], then register the instance with the environment and
/// wait for it to appear in the machine listing
pub struct MachineRegister {
    add: MachineAdd,
    env: Arc<dyn Environment>,
    ssh_key: Option<String>,
    wait: WaitConfig,
}

impl MachineRegister {
    pub fn new(add: MachineAdd, env: Arc<dyn Environment>, wait: WaitConfig) -> Self {
        Self {
            add,
            env,
            ssh_key: None,
            wait,
        }
    }

    pub fn with_ssh_key(mut self, ssh_key: Option<String>) -> Self {
        self.ssh_key = ssh_key;
        self
    }

    pub fn spec(&self) -> &InstanceSpec {
        self.add.spec()
    }

    /// Returns the instance and its machine id
    pub async fn run(&self) -> Result<(Instance, String), OperationError> {
        let instance = self.add.run().await?;
        let Some(address) = instance.address().map(str::to_string) else {
            return Err(OperationError::Provisioning(CloudError::InvalidResponse(
                format!("instance {} is active without an address", instance.id),
            )));
        };

        info!("Registering {} with environment {}", address, self.env.name());
        if let Err(e) = self
            .env
            .add_machine(&address, self.ssh_key.as_deref())
            .await
        {
            return Err(OperationError::Registration {
                instance: Box::new(instance),
                source: RegistrationFailure::Refused(e),
            });
        }

        let addr = address.as_str();
        let listed = poll_until(self.wait, || async move {
            let status = self.env.status().await?;
            Ok::<_, EnvError>(status.machine_id_for_address(addr).map(str::to_string))
        })
        .await;

        match listed {
            Ok(machine_id) => Ok((instance, machine_id)),
            Err(e) => {
                let source = match e {
                    WaitError::Check(e) => RegistrationFailure::Refused(e),
                    WaitError::TimedOut { waited, .. } => {
                        RegistrationFailure::NotListed { address, waited }
                    }
                };
                Err(OperationError::Registration {
                    instance: Box::new(instance),
                    source,
                })
            }
        }
    }
}

/// Which halves of a destroy run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DestroyMode {
    /// Deregister, then destroy the instance
    #[default]
    Full,
    /// Deregister only; the provider side could not be resolved
    EnvironmentOnly,
    /// Destroy the instance only; environment state is being discarded
    ProviderOnly,
}

impl DestroyMode {
    fn touches_environment(self) -> bool {
        self != DestroyMode::ProviderOnly
    }

    fn touches_provider(self) -> bool {
        self != DestroyMode::EnvironmentOnly
    }
}

impl fmt::Display for DestroyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestroyMode::Full => write!(f, "full"),
            DestroyMode::EnvironmentOnly => write!(f, "env-only"),
            DestroyMode::ProviderOnly => write!(f, "provider-only"),
        }
    }
}

/// What a destroy actually did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyOutcome {
    pub machine_id: Option<String>,
    pub instance_id: Option<u64>,
    pub deregistered: bool,
    /// The provider destroyed `instance_id`
    pub instance_destroyed: bool,
    /// Provider event id of the destroy, if the provider reported one
    pub event_id: Option<u64>,
}

/// Remove a machine from the environment, then destroy its instance
pub struct MachineDestroy {
    provider: Arc<dyn CloudProvider>,
    env: Arc<dyn Environment>,
    machine_id: Option<String>,
    instance_id: Option<u64>,
    mode: DestroyMode,
}

impl MachineDestroy {
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        env: Arc<dyn Environment>,
        machine_id: Option<String>,
        instance_id: Option<u64>,
        mode: DestroyMode,
    ) -> Self {
        Self {
            provider,
            env,
            machine_id,
            instance_id,
            mode,
        }
    }

    pub fn machine_id(&self) -> Option<&str> {
        self.machine_id.as_deref()
    }

    pub fn instance_id(&self) -> Option<u64> {
        self.instance_id
    }

    pub fn mode(&self) -> DestroyMode {
        self.mode
    }

    pub async fn run(&self) -> Result<DestroyOutcome, OperationError> {
        let mut outcome = DestroyOutcome {
            machine_id: self.machine_id.clone(),
            instance_id: self.instance_id,
            deregistered: false,
            instance_destroyed: false,
            event_id: None,
        };

        if self.mode.touches_environment() {
            if let Some(machine_id) = &self.machine_id {
                debug!("Terminating machine {}", machine_id);
                // a failure here must leave the instance alone
                self.env
                    .terminate_machines(std::slice::from_ref(machine_id))
                    .await
                    .map_err(OperationError::Environment)?;
                outcome.deregistered = true;
            }
        }

        if self.mode.touches_provider() {
            match self.instance_id {
                Some(instance_id) => {
                    debug!("Destroying instance {}", instance_id);
                    outcome.event_id = self
                        .provider
                        .destroy_instance(instance_id)
                        .await
                        .map_err(OperationError::Provider)?;
                    outcome.instance_destroyed = true;
                }
                None => debug!("No instance id, skipping provider destroy"),
            }
        }

        Ok(outcome)
    }
}

/// Terminal value of a successful operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutput {
    Added(Instance),
    Registered { instance: Instance, machine_id: String },
    Destroyed(DestroyOutcome),
}

impl OperationOutput {
    pub fn into_instance(self) -> Option<Instance> {
        match self {
            OperationOutput::Added(instance) => Some(instance),
            OperationOutput::Registered { instance, .. } => Some(instance),
            OperationOutput::Destroyed(_) => None,
        }
    }
}

/// A unit of work for the [`Runner`](crate::Runner)
pub enum Operation {
    Add(MachineAdd),
    Register(MachineRegister),
    Destroy(MachineDestroy),
}

impl Operation {
    /// Short label for logs
    pub fn describe(&self) -> String {
        match self {
            Operation::Add(op) => format!("add {}", op.spec().name),
            Operation::Register(op) => format!("register {}", op.spec().name),
            Operation::Destroy(op) => {
                let machine = op.machine_id().unwrap_or("-");
                let instance = op
                    .instance_id()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string());
                format!(
                    "destroy machine:{} instance:{} ({})",
                    machine, instance, op.mode()
                )
            }
        }
    }

    pub async fn execute(&self) -> Result<OperationOutput, OperationError> {
        match self {
            Operation::Add(op) => op.run().await.map(OperationOutput::Added),
            Operation::Register(op) => op
                .run()
                .await
                .map(|(instance, machine_id)| OperationOutput::Registered {
                    instance,
                    machine_id,
                }),
            Operation::Destroy(op) => op.run().await.map(OperationOutput::Destroyed),
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Operation").field(&self.describe()).finish()
    }
}

impl From<MachineAdd> for Operation {
    fn from(op: MachineAdd) -> Self {
        Operation::Add(op)
    }
}

impl From<MachineRegister> for Operation {
    fn from(op: MachineRegister) -> Self {
        Operation::Register(op)
    }
}

impl From<MachineDestroy> for Operation {
    fn from(op: MachineDestroy) -> Self {
        Operation::Destroy(op)
    }
}
