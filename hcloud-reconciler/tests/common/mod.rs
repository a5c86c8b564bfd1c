//! Test helpers for hcloud-reconciler integration tests.
//!
//! `FakeCloud` keeps every provider resource in memory, records each API call
//! by method name and hands out actions that report `running` for a
//! configurable number of polls before they settle.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use ipnet::IpNet;

use hcloud_reconciler::audit::ReconcileAuditLogger;
use hcloud_reconciler::convert::ssh;
use hcloud_reconciler::provider::*;

pub const TEST_SSH_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIAABAgMEBQYHCAkKCwwNDg8QERITFBUWFxgZGhscHR4f user@host";
pub const TEST_SSH_FINGERPRINT: &str = "0f:a2:0a:d7:38:3e:65:45:08:6b:63:84:1c:ff:dc:ba";

struct ScriptedAction {
    polls_left: u32,
    fail: bool,
}

#[derive(Default)]
pub struct State {
    pub calls: Vec<String>,
    next_id: ResourceId,

    pub networks: BTreeMap<ResourceId, Network>,
    pub servers: BTreeMap<ResourceId, Server>,
    pub server_requests: Vec<ServerCreateRequest>,
    pub firewalls: BTreeMap<ResourceId, Firewall>,
    pub load_balancers: BTreeMap<ResourceId, LoadBalancer>,
    pub volumes: BTreeMap<ResourceId, Volume>,
    pub placement_groups: BTreeMap<ResourceId, PlacementGroup>,

    pub images: Vec<Image>,
    pub server_types: Vec<ServerType>,
    pub datacenters: Vec<Datacenter>,
    pub locations: Vec<Location>,
    pub ssh_keys: Vec<SshKey>,

    actions: HashMap<ResourceId, ScriptedAction>,
    /// Polls an action reports `running` before it settles.
    pub running_polls: u32,
    /// Action commands that end in `error`.
    pub failing_commands: HashSet<String>,
    /// API methods that fail with a server error.
    pub failing_calls: HashSet<String>,
    /// Side effects run right before the nth call (1-based) of a method.
    hooks: Vec<(String, usize, fn(&mut State))>,
}

impl State {
    fn next_id(&mut self) -> ResourceId {
        self.next_id += 1;
        self.next_id
    }

    fn action(&mut self, command: &str) -> Action {
        let id = self.next_id();
        self.actions.insert(
            id,
            ScriptedAction {
                polls_left: self.running_polls,
                fail: self.failing_commands.contains(command),
            },
        );
        Action {
            id,
            command: command.to_string(),
            status: ActionStatus::Running,
            error: None,
        }
    }

    fn location(&self, name: &str) -> Location {
        self.locations
            .iter()
            .find(|l| l.name == name)
            .cloned()
            .unwrap_or(Location {
                id: 0,
                name: name.to_string(),
                network_zone: "eu-central".to_string(),
            })
    }
}

fn not_found(kind: &str) -> ProviderError {
    ProviderError::api(404, "not_found", format!("{} not found", kind))
}

pub struct FakeCloud {
    state: Mutex<State>,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                next_id: 1000,
                ..Default::default()
            }),
        })
    }

    /// A fake with the catalog entries the server and volume tests refer to.
    pub fn with_catalog() -> Arc<Self> {
        let cloud = Self::new();
        {
            let mut state = cloud.state();
            let fsn1 = Location {
                id: 1,
                name: "fsn1".to_string(),
                network_zone: "eu-central".to_string(),
            };
            let nbg1 = Location {
                id: 2,
                name: "nbg1".to_string(),
                network_zone: "eu-central".to_string(),
            };
            state.datacenters.push(Datacenter {
                id: 4,
                name: "fsn1-dc14".to_string(),
                location: fsn1.clone(),
            });
            state.locations = vec![fsn1, nbg1];
            state.images = vec![
                Image {
                    id: 161547269,
                    name: Some("ubuntu-24.04".to_string()),
                    architecture: Architecture::X86,
                },
                Image {
                    id: 161547270,
                    name: Some("ubuntu-24.04".to_string()),
                    architecture: Architecture::Arm,
                },
            ];
            state.server_types.push(ServerType {
                id: 104,
                name: "cx22".to_string(),
            });
        }
        cloud
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// `Cloud` handle with a fast action waiter.
    pub fn cloud(self: &Arc<Self>) -> Cloud {
        Cloud::new(
            self.clone(),
            ActionWaiter::new(Duration::from_millis(1), Duration::from_secs(5)),
        )
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Calls other than reads and action polls.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("get_") && !c.ends_with("_by_name"))
            .filter(|c| c != "ssh_key_by_fingerprint")
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn fail_command(&self, command: &str) {
        self.state().failing_commands.insert(command.to_string());
    }

    pub fn fail_call(&self, method: &str) {
        self.state().failing_calls.insert(method.to_string());
    }

    /// Run `hook` on the state right before the `nth` call of `method`.
    pub fn on_call(&self, method: &str, nth: usize, hook: fn(&mut State)) {
        self.state().hooks.push((method.to_string(), nth, hook));
    }

    fn begin(&self, method: &str) -> Result<MutexGuard<'_, State>> {
        let mut state = self.state();
        state.calls.push(method.to_string());
        let count = state.calls.iter().filter(|c| *c == method).count();
        let due: Vec<fn(&mut State)> = state
            .hooks
            .iter()
            .filter(|(m, nth, _)| m == method && *nth == count)
            .map(|(_, _, hook)| *hook)
            .collect();
        for hook in due {
            hook(&mut state);
        }
        if state.failing_calls.contains(method) {
            return Err(ProviderError::api(500, "server_error", "injected failure"));
        }
        Ok(state)
    }
}

pub fn audit() -> ReconcileAuditLogger {
    ReconcileAuditLogger::new_noop()
}

// ============================================================================
// Provider API
// ============================================================================

#[async_trait]
impl ActionApi for FakeCloud {
    async fn get_action(&self, id: ResourceId) -> Result<Action> {
        let mut state = self.begin("get_action")?;
        let script = state.actions.get_mut(&id).ok_or_else(|| not_found("action"))?;

        let (status, error) = if script.polls_left > 0 {
            script.polls_left -= 1;
            (ActionStatus::Running, None)
        } else if script.fail {
            (
                ActionStatus::Error,
                Some(ActionFailure {
                    code: "action_failed".to_string(),
                    message: "scripted failure".to_string(),
                }),
            )
        } else {
            (ActionStatus::Success, None)
        };

        Ok(Action {
            id,
            command: "scripted".to_string(),
            status,
            error,
        })
    }
}

#[async_trait]
impl NetworkApi for FakeCloud {
    async fn get_network(&self, id: ResourceId) -> Result<Option<Network>> {
        let state = self.begin("get_network")?;
        Ok(state.networks.get(&id).cloned())
    }

    async fn create_network(&self, req: &NetworkCreateRequest) -> Result<Network> {
        let mut state = self.begin("create_network")?;
        let id = state.next_id();
        let network = Network {
            id,
            name: req.name.clone(),
            ip_range: req.ip_range,
            subnets: req.subnets.clone(),
            routes: req.routes.clone(),
            labels: req.labels.clone(),
            expose_routes_to_vswitch: req.expose_routes_to_vswitch,
        };
        state.networks.insert(id, network.clone());
        Ok(network)
    }

    async fn update_network(&self, id: ResourceId, req: &NetworkUpdateRequest) -> Result<Network> {
        let mut state = self.begin("update_network")?;
        let network = state.networks.get_mut(&id).ok_or_else(|| not_found("network"))?;
        network.labels = req.labels.clone();
        if let Some(expose) = req.expose_routes_to_vswitch {
            network.expose_routes_to_vswitch = expose;
        }
        Ok(network.clone())
    }

    async fn delete_network(&self, id: ResourceId) -> Result<()> {
        let mut state = self.begin("delete_network")?;
        state.networks.remove(&id).ok_or_else(|| not_found("network"))?;
        Ok(())
    }

    async fn change_network_ip_range(&self, id: ResourceId, ip_range: IpNet) -> Result<Action> {
        let mut state = self.begin("change_network_ip_range")?;
        let network = state.networks.get_mut(&id).ok_or_else(|| not_found("network"))?;
        network.ip_range = ip_range;
        Ok(state.action("change_ip_range"))
    }
}

#[async_trait]
impl ServerApi for FakeCloud {
    async fn get_server(&self, id: ResourceId) -> Result<Option<Server>> {
        let state = self.begin("get_server")?;
        Ok(state.servers.get(&id).cloned())
    }

    async fn create_server(&self, req: &ServerCreateRequest) -> Result<ServerCreateResult> {
        let mut state = self.begin("create_server")?;
        let id = state.next_id();
        let server = Server {
            id,
            name: req.name.clone(),
            status: if req.start_after_create {
                ServerStatus::Running
            } else {
                ServerStatus::Off
            },
            labels: req.labels.clone(),
            public_net: ServerPublicNet {
                ipv4: req.public_net.enable_ipv4.then(|| IpRef {
                    ip: format!("203.0.113.{}", id % 250),
                }),
                ipv6: req.public_net.enable_ipv6.then(|| IpRef {
                    ip: "2001:db8::/64".to_string(),
                }),
            },
        };
        state.servers.insert(id, server.clone());
        state.server_requests.push(req.clone());

        let action = state.action("create_server");
        Ok(ServerCreateResult {
            server,
            action: Some(action),
            next_actions: vec![],
            root_password: req.ssh_keys.is_empty().then(|| "s3cr3t".to_string()),
        })
    }

    async fn update_server(&self, id: ResourceId, req: &LabelsUpdate) -> Result<Server> {
        let mut state = self.begin("update_server")?;
        let server = state.servers.get_mut(&id).ok_or_else(|| not_found("server"))?;
        server.labels = req.labels.clone();
        Ok(server.clone())
    }

    async fn delete_server(&self, id: ResourceId) -> Result<Option<Action>> {
        let mut state = self.begin("delete_server")?;
        state.servers.remove(&id).ok_or_else(|| not_found("server"))?;
        Ok(Some(state.action("delete_server")))
    }

    async fn power_on_server(&self, id: ResourceId) -> Result<Action> {
        let mut state = self.begin("power_on_server")?;
        let server = state.servers.get_mut(&id).ok_or_else(|| not_found("server"))?;
        server.status = ServerStatus::Running;
        Ok(state.action("start_server"))
    }

    async fn power_off_server(&self, id: ResourceId) -> Result<Action> {
        let mut state = self.begin("power_off_server")?;
        let server = state.servers.get_mut(&id).ok_or_else(|| not_found("server"))?;
        server.status = ServerStatus::Off;
        Ok(state.action("stop_server"))
    }
}

#[async_trait]
impl FirewallApi for FakeCloud {
    async fn get_firewall(&self, id: ResourceId) -> Result<Option<Firewall>> {
        let state = self.begin("get_firewall")?;
        Ok(state.firewalls.get(&id).cloned())
    }

    async fn create_firewall(&self, req: &FirewallCreateRequest) -> Result<FirewallCreateResult> {
        let mut state = self.begin("create_firewall")?;
        let id = state.next_id();
        let firewall = Firewall {
            id,
            name: req.name.clone(),
            labels: req.labels.clone(),
            rules: req.rules.clone(),
            applied_to: req.apply_to.clone(),
        };
        state.firewalls.insert(id, firewall.clone());
        let actions = req
            .apply_to
            .iter()
            .map(|_| state.action("apply_firewall"))
            .collect();
        Ok(FirewallCreateResult { firewall, actions })
    }

    async fn update_firewall(&self, id: ResourceId, req: &LabelsUpdate) -> Result<Firewall> {
        let mut state = self.begin("update_firewall")?;
        let firewall = state.firewalls.get_mut(&id).ok_or_else(|| not_found("firewall"))?;
        firewall.labels = req.labels.clone();
        Ok(firewall.clone())
    }

    async fn delete_firewall(&self, id: ResourceId) -> Result<()> {
        let mut state = self.begin("delete_firewall")?;
        let firewall = state.firewalls.get(&id).ok_or_else(|| not_found("firewall"))?;
        if !firewall.applied_to.is_empty() {
            return Err(ProviderError::api(
                422,
                "resource_in_use",
                "firewall is still applied",
            ));
        }
        state.firewalls.remove(&id);
        Ok(())
    }

    async fn apply_firewall_to_resources(
        &self,
        id: ResourceId,
        resources: &[FirewallResource],
    ) -> Result<Vec<Action>> {
        let mut state = self.begin("apply_firewall_to_resources")?;
        let firewall = state.firewalls.get_mut(&id).ok_or_else(|| not_found("firewall"))?;
        for resource in resources {
            if firewall.applied_to.contains(resource) {
                return Err(ProviderError::api(
                    422,
                    "firewall_already_applied",
                    "firewall already applied",
                ));
            }
            firewall.applied_to.push(resource.clone());
        }
        Ok(resources
            .iter()
            .map(|_| state.action("apply_firewall"))
            .collect())
    }

    async fn remove_firewall_from_resources(
        &self,
        id: ResourceId,
        resources: &[FirewallResource],
    ) -> Result<Vec<Action>> {
        let mut state = self.begin("remove_firewall_from_resources")?;
        let firewall = state.firewalls.get_mut(&id).ok_or_else(|| not_found("firewall"))?;
        firewall.applied_to.retain(|r| !resources.contains(r));
        Ok(resources
            .iter()
            .map(|_| state.action("remove_firewall"))
            .collect())
    }

    async fn set_firewall_rules(
        &self,
        id: ResourceId,
        rules: &[FirewallRule],
    ) -> Result<Vec<Action>> {
        let mut state = self.begin("set_firewall_rules")?;
        let firewall = state.firewalls.get_mut(&id).ok_or_else(|| not_found("firewall"))?;
        firewall.rules = rules.to_vec();
        Ok(vec![state.action("set_firewall_rules")])
    }
}

impl FakeCloud {
    fn with_load_balancer<T>(
        &self,
        method: &str,
        id: ResourceId,
        command: &str,
        f: impl FnOnce(&mut LoadBalancer) -> Result<T>,
    ) -> Result<Action> {
        let mut state = self.begin(method)?;
        let lb = state
            .load_balancers
            .get_mut(&id)
            .ok_or_else(|| not_found("load balancer"))?;
        f(lb)?;
        Ok(state.action(command))
    }
}

#[async_trait]
impl LoadBalancerApi for FakeCloud {
    async fn get_load_balancer(&self, id: ResourceId) -> Result<Option<LoadBalancer>> {
        let state = self.begin("get_load_balancer")?;
        Ok(state.load_balancers.get(&id).cloned())
    }

    async fn create_load_balancer(
        &self,
        req: &LoadBalancerCreateRequest,
    ) -> Result<LoadBalancerCreateResult> {
        let mut state = self.begin("create_load_balancer")?;
        let id = state.next_id();
        let lb = LoadBalancer {
            id,
            name: req.name.clone(),
            labels: req.labels.clone(),
            load_balancer_type: LoadBalancerTypeRef {
                name: req.load_balancer_type.clone(),
            },
            algorithm: req.algorithm,
            public_net: LoadBalancerPublicNet {
                enabled: req.public_interface,
            },
            private_net: req
                .network
                .map(|network| LoadBalancerPrivateNet { network, ip: None })
                .into_iter()
                .collect(),
            services: req.services.clone(),
            targets: req.targets.clone(),
        };
        state.load_balancers.insert(id, lb.clone());
        let action = state.action("create_load_balancer");
        Ok(LoadBalancerCreateResult {
            load_balancer: lb,
            action: Some(action),
        })
    }

    async fn update_load_balancer(
        &self,
        id: ResourceId,
        req: &LabelsUpdate,
    ) -> Result<LoadBalancer> {
        let mut state = self.begin("update_load_balancer")?;
        let lb = state
            .load_balancers
            .get_mut(&id)
            .ok_or_else(|| not_found("load balancer"))?;
        lb.labels = req.labels.clone();
        Ok(lb.clone())
    }

    async fn delete_load_balancer(&self, id: ResourceId) -> Result<()> {
        let mut state = self.begin("delete_load_balancer")?;
        state
            .load_balancers
            .remove(&id)
            .ok_or_else(|| not_found("load balancer"))?;
        Ok(())
    }

    async fn change_load_balancer_type(&self, id: ResourceId, lb_type: &str) -> Result<Action> {
        self.with_load_balancer("change_load_balancer_type", id, "change_type", |lb| {
            lb.load_balancer_type.name = lb_type.to_string();
            Ok(())
        })
    }

    async fn set_load_balancer_public_interface(
        &self,
        id: ResourceId,
        enabled: bool,
    ) -> Result<Action> {
        self.with_load_balancer(
            "set_load_balancer_public_interface",
            id,
            "change_public_interface",
            |lb| {
                lb.public_net.enabled = enabled;
                Ok(())
            },
        )
    }

    async fn change_load_balancer_algorithm(
        &self,
        id: ResourceId,
        algorithm: AlgorithmType,
    ) -> Result<Action> {
        self.with_load_balancer(
            "change_load_balancer_algorithm",
            id,
            "change_algorithm",
            |lb| {
                lb.algorithm.kind = algorithm;
                Ok(())
            },
        )
    }

    async fn attach_load_balancer_to_network(
        &self,
        id: ResourceId,
        network: ResourceId,
    ) -> Result<Action> {
        self.with_load_balancer(
            "attach_load_balancer_to_network",
            id,
            "attach_to_network",
            |lb| {
                lb.private_net.push(LoadBalancerPrivateNet { network, ip: None });
                Ok(())
            },
        )
    }

    async fn detach_load_balancer_from_network(
        &self,
        id: ResourceId,
        network: ResourceId,
    ) -> Result<Action> {
        self.with_load_balancer(
            "detach_load_balancer_from_network",
            id,
            "detach_from_network",
            |lb| {
                lb.private_net.retain(|p| p.network != network);
                Ok(())
            },
        )
    }

    async fn add_load_balancer_service(
        &self,
        id: ResourceId,
        service: &LoadBalancerService,
    ) -> Result<Action> {
        self.with_load_balancer("add_load_balancer_service", id, "add_service", |lb| {
            if lb
                .services
                .iter()
                .any(|s| s.listen_port == service.listen_port)
            {
                return Err(ProviderError::api(
                    409,
                    "source_port_already_used",
                    "listen port already used",
                ));
            }
            lb.services.push(service.clone());
            Ok(())
        })
    }

    async fn delete_load_balancer_service(
        &self,
        id: ResourceId,
        listen_port: u16,
    ) -> Result<Action> {
        self.with_load_balancer("delete_load_balancer_service", id, "delete_service", |lb| {
            let before = lb.services.len();
            lb.services.retain(|s| s.listen_port != listen_port);
            if lb.services.len() == before {
                return Err(not_found("service"));
            }
            Ok(())
        })
    }

    async fn add_load_balancer_target(
        &self,
        id: ResourceId,
        target: &LoadBalancerTarget,
    ) -> Result<Action> {
        self.with_load_balancer("add_load_balancer_target", id, "add_target", |lb| {
            if lb.targets.iter().any(|t| t.target == target.target) {
                return Err(ProviderError::api(
                    409,
                    "target_already_defined",
                    "target already defined",
                ));
            }
            lb.targets.push(target.clone());
            Ok(())
        })
    }

    async fn remove_load_balancer_target(
        &self,
        id: ResourceId,
        target: &LoadBalancerTarget,
    ) -> Result<Action> {
        self.with_load_balancer("remove_load_balancer_target", id, "remove_target", |lb| {
            lb.targets.retain(|t| t.target != target.target);
            Ok(())
        })
    }
}

#[async_trait]
impl VolumeApi for FakeCloud {
    async fn get_volume(&self, id: ResourceId) -> Result<Option<Volume>> {
        let state = self.begin("get_volume")?;
        Ok(state.volumes.get(&id).cloned())
    }

    async fn create_volume(&self, req: &VolumeCreateRequest) -> Result<VolumeCreateResult> {
        let mut state = self.begin("create_volume")?;
        let id = state.next_id();
        let location = req.location.as_deref().map(|name| state.location(name));
        let volume = Volume {
            id,
            name: req.name.clone(),
            size: req.size,
            server: req.server,
            labels: req.labels.clone(),
            location,
        };
        state.volumes.insert(id, volume.clone());
        let action = state.action("create_volume");
        Ok(VolumeCreateResult {
            volume,
            action: Some(action),
            next_actions: vec![],
        })
    }

    async fn update_volume(&self, id: ResourceId, req: &LabelsUpdate) -> Result<Volume> {
        let mut state = self.begin("update_volume")?;
        let volume = state.volumes.get_mut(&id).ok_or_else(|| not_found("volume"))?;
        volume.labels = req.labels.clone();
        Ok(volume.clone())
    }

    async fn delete_volume(&self, id: ResourceId) -> Result<()> {
        let mut state = self.begin("delete_volume")?;
        let volume = state.volumes.get(&id).ok_or_else(|| not_found("volume"))?;
        if volume.server.is_some() {
            return Err(ProviderError::api(422, "locked", "volume is attached"));
        }
        state.volumes.remove(&id);
        Ok(())
    }

    async fn attach_volume(
        &self,
        id: ResourceId,
        server: ResourceId,
        _automount: bool,
    ) -> Result<Action> {
        let mut state = self.begin("attach_volume")?;
        let volume = state.volumes.get_mut(&id).ok_or_else(|| not_found("volume"))?;
        if volume.server.is_some() {
            return Err(ProviderError::api(422, "locked", "volume is attached"));
        }
        volume.server = Some(server);
        Ok(state.action("attach_volume"))
    }

    async fn detach_volume(&self, id: ResourceId) -> Result<Action> {
        let mut state = self.begin("detach_volume")?;
        let volume = state.volumes.get_mut(&id).ok_or_else(|| not_found("volume"))?;
        volume.server = None;
        Ok(state.action("detach_volume"))
    }

    async fn resize_volume(&self, id: ResourceId, size: u32) -> Result<Action> {
        let mut state = self.begin("resize_volume")?;
        let volume = state.volumes.get_mut(&id).ok_or_else(|| not_found("volume"))?;
        if size <= volume.size {
            return Err(ProviderError::api(
                422,
                "invalid_input",
                "volumes can only grow",
            ));
        }
        volume.size = size;
        Ok(state.action("resize_volume"))
    }
}

#[async_trait]
impl PlacementGroupApi for FakeCloud {
    async fn get_placement_group(&self, id: ResourceId) -> Result<Option<PlacementGroup>> {
        let state = self.begin("get_placement_group")?;
        Ok(state.placement_groups.get(&id).cloned())
    }

    async fn create_placement_group(
        &self,
        req: &PlacementGroupCreateRequest,
    ) -> Result<PlacementGroupCreateResult> {
        let mut state = self.begin("create_placement_group")?;
        let id = state.next_id();
        let group = PlacementGroup {
            id,
            name: req.name.clone(),
            labels: req.labels.clone(),
            kind: req.kind,
            servers: vec![],
        };
        state.placement_groups.insert(id, group.clone());
        Ok(PlacementGroupCreateResult {
            placement_group: group,
            action: None,
        })
    }

    async fn update_placement_group(
        &self,
        id: ResourceId,
        req: &LabelsUpdate,
    ) -> Result<PlacementGroup> {
        let mut state = self.begin("update_placement_group")?;
        let group = state
            .placement_groups
            .get_mut(&id)
            .ok_or_else(|| not_found("placement group"))?;
        group.labels = req.labels.clone();
        Ok(group.clone())
    }

    async fn delete_placement_group(&self, id: ResourceId) -> Result<()> {
        let mut state = self.begin("delete_placement_group")?;
        state
            .placement_groups
            .remove(&id)
            .ok_or_else(|| not_found("placement group"))?;
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for FakeCloud {
    async fn image_by_name(&self, name: &str, arch: Architecture) -> Result<Option<Image>> {
        let state = self.begin("image_by_name")?;
        Ok(state
            .images
            .iter()
            .find(|i| i.name.as_deref() == Some(name) && i.architecture == arch)
            .cloned())
    }

    async fn server_type_by_name(&self, name: &str) -> Result<Option<ServerType>> {
        let state = self.begin("server_type_by_name")?;
        Ok(state.server_types.iter().find(|t| t.name == name).cloned())
    }

    async fn datacenter_by_name(&self, name: &str) -> Result<Option<Datacenter>> {
        let state = self.begin("datacenter_by_name")?;
        Ok(state.datacenters.iter().find(|d| d.name == name).cloned())
    }

    async fn location_by_name(&self, name: &str) -> Result<Option<Location>> {
        let state = self.begin("location_by_name")?;
        Ok(state.locations.iter().find(|l| l.name == name).cloned())
    }

    async fn ssh_key_by_fingerprint(&self, fingerprint: &str) -> Result<Option<SshKey>> {
        let state = self.begin("ssh_key_by_fingerprint")?;
        Ok(state
            .ssh_keys
            .iter()
            .find(|k| k.fingerprint == fingerprint)
            .cloned())
    }

    async fn create_ssh_key(&self, req: &SshKeyCreateRequest) -> Result<SshKey> {
        let mut state = self.begin("create_ssh_key")?;
        let id = state.next_id();
        let key = SshKey {
            id,
            name: req.name.clone(),
            fingerprint: ssh::fingerprint(&req.public_key).unwrap(),
            public_key: req.public_key.clone(),
            labels: req.labels.clone(),
        };
        state.ssh_keys.push(key.clone());
        Ok(key)
    }
}
