//! In-memory inventory service.
//!
//! `FakeInventory` implements [`InventoryClient`] over plain vectors so that
//! reconcilers can be exercised without a remote service. Every call is
//! appended to a call log ([`FakeInventory::calls`]) and any operation can be
//! made to fail once with [`FakeInventory::fail_next`].

use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use ipam_client::{
    Building, InventoryClient, IpAddress, IpFilter, RemoteError, RemoteResult, Subnet,
    SubnetFilter, Vlan, VrfGroup,
};
use ipam_common::RemoteId;
use ipnet::Ipv4Net;
use tracing::debug;

/// First id handed out for created records.
const FIRST_ID: u64 = 1000;

#[derive(Debug, Default)]
struct FakeState {
    next_id: u64,
    buildings: Vec<Building>,
    vrf_groups: Vec<VrfGroup>,
    subnets: Vec<Subnet>,
    vlans: Vec<Vlan>,
    ips: Vec<IpAddress>,
    calls: Vec<String>,
    faults: HashMap<String, VecDeque<Option<RemoteError>>>,
    subnet_upserts: Vec<Subnet>,
    ip_upserts: Vec<IpAddress>,
}

impl FakeState {
    fn assign_id(&mut self) -> RemoteId {
        let id = RemoteId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Logs the call and pops an injected fault for `method`, if any.
    fn begin(&mut self, method: &str, args: String) -> RemoteResult<()> {
        let entry = if args.is_empty() {
            method.to_string()
        } else {
            format!("{} {}", method, args)
        };
        debug!("fake inventory call: {}", entry);
        self.calls.push(entry);

        match self.faults.get_mut(method).and_then(VecDeque::pop_front) {
            Some(Some(err)) => Err(err),
            _ => Ok(()),
        }
    }
}

fn id_text(id: Option<RemoteId>) -> String {
    id.map_or_else(|| "none".to_string(), |id| id.to_string())
}

/// Inserts or replaces `record` in `rows`, assigning an id when absent.
fn upsert_row<T: Clone>(
    rows: &mut Vec<T>,
    record: &T,
    id_of: impl Fn(&T) -> Option<RemoteId>,
    fresh_id: impl FnOnce() -> RemoteId,
    set_id: impl Fn(&mut T, RemoteId),
    kind: &str,
) -> RemoteResult<T> {
    match id_of(record) {
        Some(id) => {
            let slot = rows
                .iter_mut()
                .find(|row| id_of(row) == Some(id))
                .ok_or_else(|| RemoteError::not_found(format!("{} {} does not exist", kind, id)))?;
            *slot = record.clone();
            Ok(slot.clone())
        }
        None => {
            let mut created = record.clone();
            set_id(&mut created, fresh_id());
            rows.push(created.clone());
            Ok(created)
        }
    }
}

fn remove_row<T>(
    rows: &mut Vec<T>,
    id: RemoteId,
    id_of: impl Fn(&T) -> Option<RemoteId>,
    kind: &str,
) -> RemoteResult<()> {
    let before = rows.len();
    rows.retain(|row| id_of(row) != Some(id));
    if rows.len() == before {
        return Err(RemoteError::not_found(format!("{} {} does not exist", kind, id)));
    }
    Ok(())
}

fn find_row<T: Clone>(
    rows: &[T],
    predicate: impl Fn(&T) -> bool,
    missing: impl FnOnce() -> String,
) -> RemoteResult<T> {
    rows.iter()
        .find(|row| predicate(row))
        .cloned()
        .ok_or_else(|| RemoteError::not_found(missing()))
}

fn subnet_net(subnet: &Subnet) -> RemoteResult<Ipv4Net> {
    subnet
        .cidr()
        .parse::<Ipv4Net>()
        .map(|net| net.trunc())
        .map_err(|e| RemoteError::failed(format!("stored subnet {} is invalid: {}", subnet.cidr(), e)))
}

/// In-memory [`InventoryClient`] with a call log and one-shot fault injection.
///
/// # Example
///
/// ```ignore
/// let fake = FakeInventory::new();
/// let parent = fake.seed_subnet(fixtures::subnet(42, "pool", "10.0.0.0", 16));
/// fake.fail_next("upsert_subnet", RemoteError::failed("HTTP 500"));
/// ```
#[derive(Debug)]
pub struct FakeInventory {
    state: Mutex<FakeState>,
}

impl Default for FakeInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeInventory {
    /// Creates an empty inventory.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: FIRST_ID,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next call to `method` fail with `err`.
    ///
    /// `method` is the facade method name, e.g. `"upsert_subnet"`. Faults queue
    /// up, so calling this twice fails the next two calls.
    pub fn fail_next(&self, method: &str, err: RemoteError) {
        self.state()
            .faults
            .entry(method.to_string())
            .or_default()
            .push_back(Some(err));
    }

    /// Lets the next queued call to `method` succeed.
    ///
    /// Combined with [`fail_next`](Self::fail_next) this targets a later call,
    /// e.g. the second of two upserts.
    pub fn pass_next(&self, method: &str) {
        self.state()
            .faults
            .entry(method.to_string())
            .or_default()
            .push_back(None);
    }

    /// Returns every call made so far, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Returns the number of calls to `method`.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.split(' ').next() == Some(method))
            .count()
    }

    /// Clears the call log, leaving stored records intact.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Returns every subnet record passed to `upsert_subnet`, in call order.
    pub fn subnet_upserts(&self) -> Vec<Subnet> {
        self.state().subnet_upserts.clone()
    }

    /// Returns every IP record passed to `upsert_ip`, in call order.
    pub fn ip_upserts(&self) -> Vec<IpAddress> {
        self.state().ip_upserts.clone()
    }

    /// Stores a building as-is, assigning an id if it has none.
    pub fn seed_building(&self, mut building: Building) -> Building {
        let mut state = self.state();
        if building.id.is_none() {
            building.id = Some(state.assign_id());
        }
        state.buildings.push(building.clone());
        building
    }

    /// Stores a VRF group as-is, assigning an id if it has none.
    pub fn seed_vrf_group(&self, mut group: VrfGroup) -> VrfGroup {
        let mut state = self.state();
        if group.id.is_none() {
            group.id = Some(state.assign_id());
        }
        state.vrf_groups.push(group.clone());
        group
    }

    /// Stores a subnet as-is, assigning an id if it has none.
    pub fn seed_subnet(&self, mut subnet: Subnet) -> Subnet {
        let mut state = self.state();
        if subnet.id.is_none() {
            subnet.id = Some(state.assign_id());
        }
        state.subnets.push(subnet.clone());
        subnet
    }

    /// Stores a VLAN as-is, assigning an id if it has none.
    pub fn seed_vlan(&self, mut vlan: Vlan) -> Vlan {
        let mut state = self.state();
        if vlan.id.is_none() {
            vlan.id = Some(state.assign_id());
        }
        state.vlans.push(vlan.clone());
        vlan
    }

    /// Stores an IP address as-is, assigning an id if it has none.
    pub fn seed_ip(&self, mut ip: IpAddress) -> IpAddress {
        let mut state = self.state();
        if ip.id.is_none() {
            ip.id = Some(state.assign_id());
        }
        state.ips.push(ip.clone());
        ip
    }

    /// Returns the stored subnet with `id` without logging a call.
    pub fn subnet(&self, id: RemoteId) -> Option<Subnet> {
        self.state()
            .subnets
            .iter()
            .find(|s| s.id == Some(id))
            .cloned()
    }

    /// Returns the stored IP with `id` without logging a call.
    pub fn ip(&self, id: RemoteId) -> Option<IpAddress> {
        self.state().ips.iter().find(|ip| ip.id == Some(id)).cloned()
    }

    /// Returns the stored building with `id` without logging a call.
    pub fn building(&self, id: RemoteId) -> Option<Building> {
        self.state()
            .buildings
            .iter()
            .find(|b| b.id == Some(id))
            .cloned()
    }
}

#[async_trait]
impl InventoryClient for FakeInventory {
    async fn get_building(&self, id: RemoteId) -> RemoteResult<Building> {
        let mut state = self.state();
        state.begin("get_building", id.to_string())?;
        find_row(&state.buildings, |b| b.id == Some(id), || {
            format!("building {} does not exist", id)
        })
    }

    async fn get_building_by_name(&self, name: &str) -> RemoteResult<Building> {
        let mut state = self.state();
        state.begin("get_building_by_name", name.to_string())?;
        find_row(&state.buildings, |b| b.name == name, || {
            format!("building '{}' does not exist", name)
        })
    }

    async fn list_buildings(&self) -> RemoteResult<Vec<Building>> {
        let mut state = self.state();
        state.begin("list_buildings", String::new())?;
        Ok(state.buildings.clone())
    }

    async fn upsert_building(&self, building: &Building) -> RemoteResult<Building> {
        let mut state = self.state();
        state.begin("upsert_building", id_text(building.id))?;
        let id = state.next_id;
        let created = upsert_row(
            &mut state.buildings,
            building,
            |b| b.id,
            || RemoteId::new(id),
            |b, id| b.id = Some(id),
            "building",
        )?;
        if building.id.is_none() {
            state.next_id += 1;
        }
        Ok(created)
    }

    async fn delete_building(&self, id: RemoteId) -> RemoteResult<()> {
        let mut state = self.state();
        state.begin("delete_building", id.to_string())?;
        remove_row(&mut state.buildings, id, |b| b.id, "building")
    }

    async fn get_vrf_group(&self, id: RemoteId) -> RemoteResult<VrfGroup> {
        let mut state = self.state();
        state.begin("get_vrf_group", id.to_string())?;
        find_row(&state.vrf_groups, |g| g.id == Some(id), || {
            format!("vrf group {} does not exist", id)
        })
    }

    async fn get_vrf_group_by_name(&self, name: &str) -> RemoteResult<VrfGroup> {
        let mut state = self.state();
        state.begin("get_vrf_group_by_name", name.to_string())?;
        find_row(&state.vrf_groups, |g| g.name == name, || {
            format!("vrf group '{}' does not exist", name)
        })
    }

    async fn list_vrf_groups(&self) -> RemoteResult<Vec<VrfGroup>> {
        let mut state = self.state();
        state.begin("list_vrf_groups", String::new())?;
        Ok(state.vrf_groups.clone())
    }

    async fn upsert_vrf_group(&self, group: &VrfGroup) -> RemoteResult<VrfGroup> {
        let mut state = self.state();
        state.begin("upsert_vrf_group", id_text(group.id))?;
        for name in &group.buildings {
            if !state.buildings.iter().any(|b| &b.name == name) {
                return Err(RemoteError::failed(format!("unknown building '{}'", name)));
            }
        }
        let id = state.next_id;
        let stored = upsert_row(
            &mut state.vrf_groups,
            group,
            |g| g.id,
            || RemoteId::new(id),
            |g, id| g.id = Some(id),
            "vrf group",
        )?;
        if group.id.is_none() {
            state.next_id += 1;
        }
        Ok(stored)
    }

    async fn delete_vrf_group(&self, id: RemoteId) -> RemoteResult<()> {
        let mut state = self.state();
        state.begin("delete_vrf_group", id.to_string())?;
        remove_row(&mut state.vrf_groups, id, |g| g.id, "vrf group")
    }

    async fn get_subnet(&self, id: RemoteId) -> RemoteResult<Subnet> {
        let mut state = self.state();
        state.begin("get_subnet", id.to_string())?;
        find_row(&state.subnets, |s| s.id == Some(id), || {
            format!("subnet {} does not exist", id)
        })
    }

    async fn get_subnet_by_name_and_network(
        &self,
        name: &str,
        network: &str,
    ) -> RemoteResult<Subnet> {
        let mut state = self.state();
        state.begin("get_subnet_by_name_and_network", format!("{} {}", name, network))?;
        find_row(
            &state.subnets,
            |s| s.name == name && s.network == network,
            || format!("subnet '{}' in {} does not exist", name, network),
        )
    }

    async fn get_subnet_by_name_and_vrf_group(
        &self,
        name: &str,
        vrf_group_id: Option<RemoteId>,
    ) -> RemoteResult<Subnet> {
        let mut state = self.state();
        state.begin(
            "get_subnet_by_name_and_vrf_group",
            format!("{} {}", name, id_text(vrf_group_id)),
        )?;
        find_row(
            &state.subnets,
            |s| s.name == name && s.vrf_group_id == vrf_group_id,
            || format!("subnet '{}' in vrf group {} does not exist", name, id_text(vrf_group_id)),
        )
    }

    async fn list_subnets(&self, filter: &SubnetFilter) -> RemoteResult<Vec<Subnet>> {
        let mut state = self.state();
        state.begin(
            "list_subnets",
            format!(
                "vrf_group={} parent={}",
                id_text(filter.vrf_group_id),
                id_text(filter.parent_subnet_id)
            ),
        )?;
        Ok(state
            .subnets
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    async fn upsert_subnet(&self, subnet: &Subnet) -> RemoteResult<Subnet> {
        let mut state = self.state();
        state.begin("upsert_subnet", id_text(subnet.id))?;
        state.subnet_upserts.push(subnet.clone());
        let id = state.next_id;
        let stored = upsert_row(
            &mut state.subnets,
            subnet,
            |s| s.id,
            || RemoteId::new(id),
            |s, id| s.id = Some(id),
            "subnet",
        )?;
        if subnet.id.is_none() {
            state.next_id += 1;
        }
        Ok(stored)
    }

    async fn delete_subnet(&self, id: RemoteId) -> RemoteResult<()> {
        let mut state = self.state();
        state.begin("delete_subnet", id.to_string())?;
        remove_row(&mut state.subnets, id, |s| s.id, "subnet")
    }

    async fn suggest_subnet(
        &self,
        parent_subnet_id: RemoteId,
        mask_bits: u8,
        name: &str,
        mark_allocated: bool,
    ) -> RemoteResult<Subnet> {
        let mut state = self.state();
        state.begin(
            "suggest_subnet",
            format!("parent={} mask={} mark={}", parent_subnet_id, mask_bits, mark_allocated),
        )?;

        let parent = find_row(&state.subnets, |s| s.id == Some(parent_subnet_id), || {
            format!("parent subnet {} does not exist", parent_subnet_id)
        })?;
        let parent_net = subnet_net(&parent)?;

        let taken: Vec<Ipv4Net> = state
            .subnets
            .iter()
            .filter(|s| s.id != parent.id)
            .filter_map(|s| subnet_net(s).ok())
            .filter(|net| parent_net.contains(net))
            .collect();

        let candidates = parent_net.subnets(mask_bits).map_err(|_| {
            RemoteError::failed(format!(
                "mask bits {} do not fit inside {}",
                mask_bits,
                parent.cidr()
            ))
        })?;
        let free = candidates
            .into_iter()
            .find(|candidate| {
                !taken
                    .iter()
                    .any(|net| net.contains(candidate) || candidate.contains(net))
            })
            .ok_or_else(|| {
                RemoteError::failed(format!("no free /{} left in {}", mask_bits, parent.cidr()))
            })?;

        let mut suggested = Subnet::new(name, free.network().to_string(), mask_bits);
        suggested.parent_subnet_id = Some(parent_subnet_id);
        suggested.vrf_group_id = parent.vrf_group_id;
        if mark_allocated {
            suggested.id = Some(state.assign_id());
            state.subnets.push(suggested.clone());
        }
        Ok(suggested)
    }

    async fn get_vlan(&self, id: RemoteId) -> RemoteResult<Vlan> {
        let mut state = self.state();
        state.begin("get_vlan", id.to_string())?;
        find_row(&state.vlans, |v| v.id == Some(id), || {
            format!("vlan {} does not exist", id)
        })
    }

    async fn get_vlan_by_name(&self, name: &str) -> RemoteResult<Vlan> {
        let mut state = self.state();
        state.begin("get_vlan_by_name", name.to_string())?;
        find_row(&state.vlans, |v| v.name == name, || {
            format!("vlan '{}' does not exist", name)
        })
    }

    async fn list_vlans(&self) -> RemoteResult<Vec<Vlan>> {
        let mut state = self.state();
        state.begin("list_vlans", String::new())?;
        Ok(state.vlans.clone())
    }

    async fn upsert_vlan(&self, vlan: &Vlan) -> RemoteResult<Vlan> {
        let mut state = self.state();
        state.begin("upsert_vlan", id_text(vlan.id))?;
        let id = state.next_id;
        let stored = upsert_row(
            &mut state.vlans,
            vlan,
            |v| v.id,
            || RemoteId::new(id),
            |v, id| v.id = Some(id),
            "vlan",
        )?;
        if vlan.id.is_none() {
            state.next_id += 1;
        }
        Ok(stored)
    }

    async fn delete_vlan(&self, id: RemoteId) -> RemoteResult<()> {
        let mut state = self.state();
        state.begin("delete_vlan", id.to_string())?;
        remove_row(&mut state.vlans, id, |v| v.id, "vlan")
    }

    async fn get_ip(&self, id: RemoteId) -> RemoteResult<IpAddress> {
        let mut state = self.state();
        state.begin("get_ip", id.to_string())?;
        find_row(&state.ips, |ip| ip.id == Some(id), || {
            format!("ip {} does not exist", id)
        })
    }

    async fn get_ip_by_address(
        &self,
        address: &str,
        subnet_id: RemoteId,
    ) -> RemoteResult<IpAddress> {
        let mut state = self.state();
        state.begin("get_ip_by_address", format!("{} {}", address, subnet_id))?;
        find_row(
            &state.ips,
            |ip| ip.address == address && ip.subnet_id == Some(subnet_id),
            || format!("ip {} in subnet {} does not exist", address, subnet_id),
        )
    }

    async fn list_ips(&self, filter: &IpFilter) -> RemoteResult<Vec<IpAddress>> {
        let mut state = self.state();
        state.begin("list_ips", format!("subnet={}", id_text(filter.subnet_id)))?;
        Ok(state.ips.iter().filter(|ip| filter.matches(ip)).cloned().collect())
    }

    async fn upsert_ip(&self, ip: &IpAddress) -> RemoteResult<IpAddress> {
        let mut state = self.state();
        state.begin("upsert_ip", id_text(ip.id))?;
        state.ip_upserts.push(ip.clone());

        // The service fills in the owning subnet's CIDR on every write.
        let mut record = ip.clone();
        if let Some(subnet_id) = record.subnet_id {
            if let Some(subnet) = state.subnets.iter().find(|s| s.id == Some(subnet_id)) {
                record.subnet = subnet_net(subnet)?.to_string();
            }
        }

        let id = state.next_id;
        let stored = upsert_row(
            &mut state.ips,
            &record,
            |ip| ip.id,
            || RemoteId::new(id),
            |ip, id| ip.id = Some(id),
            "ip",
        )?;
        if ip.id.is_none() {
            state.next_id += 1;
        }
        Ok(stored)
    }

    async fn delete_ip(&self, id: RemoteId) -> RemoteResult<()> {
        let mut state = self.state();
        state.begin("delete_ip", id.to_string())?;
        remove_row(&mut state.ips, id, |ip| ip.id, "ip")
    }

    async fn suggest_ip(
        &self,
        vrf_group_id: Option<RemoteId>,
        subnet_id: Option<RemoteId>,
        mask_bits: u8,
        mark_allocated: bool,
    ) -> RemoteResult<IpAddress> {
        let mut state = self.state();
        state.begin(
            "suggest_ip",
            format!(
                "vrf_group={} subnet={} mask={} mark={}",
                id_text(vrf_group_id),
                id_text(subnet_id),
                mask_bits,
                mark_allocated
            ),
        )?;

        let subnet_id =
            subnet_id.ok_or_else(|| RemoteError::failed("subnet_id is required to suggest an ip"))?;
        let subnet = find_row(&state.subnets, |s| s.id == Some(subnet_id), || {
            format!("subnet {} does not exist", subnet_id)
        })?;
        if vrf_group_id.is_some() && subnet.vrf_group_id != vrf_group_id {
            return Err(RemoteError::failed(format!(
                "subnet {} is not in vrf group {}",
                subnet_id,
                id_text(vrf_group_id)
            )));
        }
        let net = subnet_net(&subnet)?;

        let gateway = subnet.gateway.parse::<Ipv4Addr>().ok();
        let used: Vec<Ipv4Addr> = state
            .ips
            .iter()
            .filter(|ip| ip.subnet_id == Some(subnet_id))
            .filter_map(|ip| ip.address.parse().ok())
            .collect();
        let free = net
            .hosts()
            .find(|addr| Some(*addr) != gateway && !used.contains(addr))
            .ok_or_else(|| RemoteError::failed(format!("no free address left in {}", net)))?;

        let vrf_group = subnet.vrf_group_id.and_then(|id| {
            state
                .vrf_groups
                .iter()
                .find(|g| g.id == Some(id))
                .map(|g| g.name.clone())
        });

        let mut suggested = IpAddress::new(free.to_string(), subnet_id);
        suggested.subnet = net.to_string();
        suggested.vrf_group_id = subnet.vrf_group_id;
        suggested.vrf_group = vrf_group.unwrap_or_default();
        if mark_allocated {
            suggested.id = Some(state.assign_id());
            state.ips.push(suggested.clone());
        }
        Ok(suggested)
    }
}
