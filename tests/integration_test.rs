//! Integration tests for ipam-engine
//!
//! These tests drive the public `Ipam` API end to end: tree maintenance,
//! allocation, utilization, validation, transactions and snapshots.

use ipam_engine::config::EngineConfig;
use ipam_engine::models::{
    ContentKind, IpAddressAttrs, IpAddressId, IpAddressRole, IpRangeSet, LocationAttrs,
    LocationTypeAttrs, Prefix, PrefixAttrs, PrefixId, PrefixType, VlanAttrs, VlanGroupAttrs,
};
use ipam_engine::{Ipam, IpamError};

fn create(ipam: &mut Ipam, cidr: &str) -> Prefix {
    ipam.create_prefix(PrefixAttrs::parse(cidr).expect("valid CIDR"))
        .expect("Failed to create prefix")
}

fn create_typed(ipam: &mut Ipam, cidr: &str, prefix_type: PrefixType) -> Prefix {
    ipam.create_prefix(PrefixAttrs::parse(cidr).unwrap().with_type(prefix_type))
        .expect("Failed to create prefix")
}

fn add_ip(ipam: &mut Ipam, address: &str) {
    ipam.create_ip_address(IpAddressAttrs::parse(address).unwrap())
        .expect("Failed to create address");
}

fn ids(prefixes: &[Prefix]) -> Vec<PrefixId> {
    prefixes.iter().map(|p| p.id).collect()
}

fn cidrs(set: &IpRangeSet) -> Vec<String> {
    set.iter_cidrs().iter().map(|n| n.to_string()).collect()
}

/// root /24, parent /25, child1 and child2 /26
fn tree_fixture() -> (Ipam, Prefix, Prefix, Prefix, Prefix) {
    let mut ipam = Ipam::new();
    let root = create(&mut ipam, "101.102.0.0/24");
    let parent = create(&mut ipam, "101.102.0.0/25");
    let child1 = create(&mut ipam, "101.102.0.0/26");
    let child2 = create(&mut ipam, "101.102.0.64/26");
    (ipam, root, parent, child1, child2)
}

#[test]
fn test_tree_methods() {
    let (mut ipam, root, parent, child1, child2) = tree_fixture();

    assert!(ipam.supernets(root.id, false, false).unwrap().is_empty());
    assert_eq!(ids(&ipam.supernets(child1.id, false, false).unwrap()), vec![root.id, parent.id]);
    assert_eq!(
        ids(&ipam.supernets(child1.id, false, true).unwrap()),
        vec![root.id, parent.id, child1.id]
    );
    assert_eq!(ids(&ipam.supernets(child1.id, true, false).unwrap()), vec![parent.id]);

    assert_eq!(
        ids(&ipam.subnets(root.id, false, false).unwrap()),
        vec![parent.id, child1.id, child2.id]
    );
    assert_eq!(ids(&ipam.subnets(root.id, true, false).unwrap()), vec![parent.id]);
    assert_eq!(
        ids(&ipam.subnets(root.id, false, true).unwrap()),
        vec![root.id, parent.id, child1.id, child2.id]
    );

    assert!(!ipam.is_child_node(root.id).unwrap());
    assert!(ipam.is_child_node(parent.id).unwrap());
    assert!(!ipam.is_leaf_node(root.id).unwrap());
    assert!(!ipam.is_leaf_node(parent.id).unwrap());
    assert!(ipam.is_leaf_node(child1.id).unwrap());
    assert!(ipam.is_root_node(root.id).unwrap());
    assert!(!ipam.is_root_node(child1.id).unwrap());

    assert_eq!(ids(&ipam.ancestors(child1.id, false, false).unwrap()), vec![root.id, parent.id]);
    assert_eq!(ids(&ipam.ancestors(child1.id, true, false).unwrap()), vec![parent.id, root.id]);
    assert_eq!(
        ids(&ipam.ancestors(child1.id, false, true).unwrap()),
        vec![root.id, parent.id, child1.id]
    );

    assert_eq!(ids(&ipam.children(parent.id).unwrap()), vec![child1.id, child2.id]);
    assert_eq!(
        ids(&ipam.descendants(root.id, false).unwrap()),
        vec![parent.id, child1.id, child2.id]
    );
    assert_eq!(
        ids(&ipam.descendants(root.id, true).unwrap()),
        vec![root.id, parent.id, child1.id, child2.id]
    );

    assert_eq!(ipam.root(child1.id).unwrap().map(|p| p.id), Some(root.id));
    assert!(ipam.root(root.id).unwrap().is_none());

    assert_eq!(ids(&ipam.siblings(child1.id, false).unwrap()), vec![child2.id]);
    assert_eq!(ids(&ipam.siblings(child1.id, true).unwrap()), vec![child1.id, child2.id]);
    let parent2 = create(&mut ipam, "101.102.0.128/25");
    assert_eq!(ids(&ipam.siblings(parent.id, false).unwrap()), vec![parent2.id]);
    assert_eq!(ids(&ipam.siblings(parent.id, true).unwrap()), vec![parent.id, parent2.id]);
}

#[test]
fn test_reparenting_on_delete_and_recreate() {
    let (mut ipam, root, parent, child1, child2) = tree_fixture();
    assert!(root.parent.is_none());
    assert_eq!(parent.parent, Some(root.id));
    assert_eq!(child1.parent, Some(parent.id));

    assert_eq!(ipam.delete_prefix(parent.id).unwrap(), 1);
    assert_eq!(ids(&ipam.children(root.id).unwrap()), vec![child1.id, child2.id]);
    assert_eq!(ipam.get_prefix(child1.id).unwrap().parent, Some(root.id));
    assert_eq!(ipam.get_prefix(child2.id).unwrap().parent, Some(root.id));
    assert_eq!(ids(&ipam.ancestors(child1.id, false, false).unwrap()), vec![root.id]);

    let recreated = create(&mut ipam, "101.102.0.0/25");
    assert_eq!(recreated.parent, Some(root.id));
    assert_eq!(ipam.get_prefix(child1.id).unwrap().parent, Some(recreated.id));
    assert_eq!(ipam.get_prefix(child2.id).unwrap().parent, Some(recreated.id));
    assert_eq!(
        ids(&ipam.ancestors(child1.id, false, false).unwrap()),
        vec![root.id, recreated.id]
    );
}

#[test]
fn test_insertion_order_independence() {
    let cidrs = [
        "10.0.0.0/8",
        "10.1.0.0/16",
        "10.1.2.0/24",
        "10.1.2.128/25",
        "10.2.0.0/16",
        "10.1.3.0/24",
        "2001:db8::/32",
        "2001:db8:1::/48",
    ];
    let shape = |order: &[&str]| -> Vec<(String, Option<String>)> {
        let mut ipam = Ipam::new();
        for cidr in order {
            create(&mut ipam, cidr);
        }
        let ns = ipam.default_namespace();
        ipam.prefixes(ns)
            .iter()
            .map(|p| {
                let parent = ipam.get_parent(p.id).unwrap().map(|pp| pp.prefix.to_string());
                (p.prefix.to_string(), parent)
            })
            .collect()
    };

    let forward = shape(&cidrs[..]);
    let mut reversed = cidrs;
    reversed.reverse();
    assert_eq!(forward, shape(&reversed[..]), "reverse insertion builds the same tree");
    let shuffled = [cidrs[3], cidrs[6], cidrs[0], cidrs[5], cidrs[7], cidrs[2], cidrs[4], cidrs[1]];
    assert_eq!(forward, shape(&shuffled[..]), "shuffled insertion builds the same tree");
    assert!(forward.contains(&("10.1.2.128/25".to_string(), Some("10.1.2.0/24".to_string()))));
}

#[test]
fn test_namespaces_are_separate_trees() {
    let mut ipam = Ipam::new();
    let lab = ipam.create_namespace("Lab", "lab space").unwrap();
    let global_parent = create(&mut ipam, "10.0.0.0/16");
    let lab_child = ipam
        .create_prefix(PrefixAttrs::parse("10.0.1.0/24").unwrap().in_namespace(lab.id))
        .unwrap();
    assert!(lab_child.parent.is_none(), "parent never crosses namespaces");
    assert!(ipam.is_leaf_node(global_parent.id).unwrap());
}

#[test]
fn test_get_child_ips() {
    let mut ipam = Ipam::new();
    let parent = create_typed(&mut ipam, "10.0.0.0/16", PrefixType::Container);
    for address in ["10.0.0.1/24", "10.0.1.1/24", "10.0.2.1/24", "10.0.3.1/24"] {
        add_ip(&mut ipam, address);
    }
    add_ip(&mut ipam, "10.1.0.1/24");
    assert_eq!(ipam.get_child_ips(parent.id).unwrap().len(), 4);

    let p31 = create_typed(&mut ipam, "10.0.4.0/31", PrefixType::Container);
    add_ip(&mut ipam, "10.0.4.0/31");
    add_ip(&mut ipam, "10.0.4.1/31");
    let child_ips: Vec<String> = ipam
        .get_child_ips(p31.id)
        .unwrap()
        .iter()
        .map(|a| a.address.to_string())
        .collect();
    assert_eq!(child_ips, vec!["10.0.4.0/31", "10.0.4.1/31"]);
}

#[test]
fn test_available_prefixes_partition_parent() {
    let mut ipam = Ipam::new();
    let parent = create(&mut ipam, "10.0.0.0/16");
    let mut children = Vec::new();
    for cidr in ["10.0.0.0/20", "10.0.32.0/20", "10.0.128.0/18"] {
        children.push(create(&mut ipam, cidr).prefix);
    }
    let free = ipam.get_available_prefixes(parent.id).unwrap();
    assert_eq!(
        cidrs(&free),
        vec!["10.0.16.0/20", "10.0.48.0/20", "10.0.64.0/18", "10.0.192.0/18"]
    );

    let used = IpRangeSet::from_networks(parent.prefix.version(), &children);
    assert_eq!(free.union(&used), IpRangeSet::from_network(&parent.prefix));
    assert!(free.difference(&used) == free, "free space is disjoint from children");
}

#[test]
fn test_first_available_prefix() {
    let mut ipam = Ipam::new();
    let parent = create(&mut ipam, "10.0.0.0/16");
    for cidr in ["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24"] {
        create(&mut ipam, cidr);
    }
    let first_24 = ipam.get_first_available_prefix(parent.id, Some(24)).unwrap();
    assert_eq!(first_24.to_string(), "10.0.3.0/24");
    let largest = ipam.get_first_available_prefix(parent.id, None).unwrap();
    assert_eq!(largest.to_string(), "10.0.128.0/17");

    create(&mut ipam, "10.0.3.0/24");
    let first_22 = ipam.get_first_available_prefix(parent.id, Some(22)).unwrap();
    assert_eq!(first_22.to_string(), "10.0.4.0/22");
}

#[test]
fn test_available_and_first_ips() {
    let mut ipam = Ipam::new();
    let parent = create(&mut ipam, "10.0.0.0/28");
    for host in [1, 3, 5, 7, 9, 11, 13] {
        add_ip(&mut ipam, &format!("10.0.0.{host}/26"));
    }
    let free = ipam.get_available_ips(parent.id).unwrap();
    assert_eq!(
        cidrs(&free),
        vec![
            "10.0.0.2/32", "10.0.0.4/32", "10.0.0.6/32", "10.0.0.8/32", "10.0.0.10/32",
            "10.0.0.12/32", "10.0.0.14/32"
        ]
    );

    let mut ipam = Ipam::new();
    let parent = create(&mut ipam, "10.0.0.0/24");
    for host in 1..=3 {
        add_ip(&mut ipam, &format!("10.0.0.{host}/24"));
    }
    let first = ipam.get_first_available_ip(parent.id).unwrap();
    assert_eq!(first.to_string(), "10.0.0.4/24");
    add_ip(&mut ipam, "10.0.0.4/24");
    let next = ipam.get_first_available_ip(parent.id).unwrap();
    assert_eq!(next.to_string(), "10.0.0.5/24");

    let occupied: Vec<u128> = ipam
        .get_child_ips(parent.id)
        .unwrap()
        .iter()
        .map(|a| a.address.bits())
        .collect();
    assert!(!occupied.contains(&next.bits()), "first available is never occupied");
}

#[test]
fn test_first_available_ip_exhaustion() {
    let mut ipam = Ipam::new();
    let parent = create(&mut ipam, "192.0.2.0/32");
    add_ip(&mut ipam, "192.0.2.0/32");
    let err = ipam.get_first_available_ip(parent.id).unwrap_err();
    assert!(matches!(err, IpamError::Exhaustion(_)), "got {err}");
}

#[test]
fn test_get_utilization() {
    let mut ipam = Ipam::new();
    let prefix = create_typed(&mut ipam, "10.0.0.0/24", PrefixType::Container);
    create(&mut ipam, "10.0.0.0/26");
    create(&mut ipam, "10.0.0.128/26");
    assert_eq!(<(u128, u128)>::from(ipam.get_utilization(prefix.id).unwrap()), (128, 256));

    let as_network = PrefixAttrs::parse("10.0.0.0/24").unwrap();
    ipam.update_prefix(prefix.id, as_network.clone()).unwrap();
    for host in 1..=32 {
        add_ip(&mut ipam, &format!("10.0.0.{host}/24"));
    }
    add_ip(&mut ipam, "10.0.0.0/32");
    add_ip(&mut ipam, "10.0.0.255/32");
    let u = ipam.get_utilization(prefix.id).unwrap();
    assert_eq!((u.used, u.total), (32, 254), "network and broadcast excluded");

    ipam.update_prefix(prefix.id, as_network.with_type(PrefixType::Pool))
        .unwrap();
    let u = ipam.get_utilization(prefix.id).unwrap();
    assert_eq!((u.used, u.total), (34, 256), "pools count every address");

    let p31 = create(&mut ipam, "10.0.1.0/31");
    add_ip(&mut ipam, "10.0.1.0/32");
    add_ip(&mut ipam, "10.0.1.1/32");
    let u = ipam.get_utilization(p31.id).unwrap();
    assert_eq!((u.used, u.total), (2, 2));

    let v6 = create(&mut ipam, "aaaa::/124");
    add_ip(&mut ipam, "aaaa::0/128");
    add_ip(&mut ipam, "aaaa::f/128");
    let u = ipam.get_utilization(v6.id).unwrap();
    assert_eq!((u.used, u.total), (2, 16));
}

#[test]
fn test_large_container_utilization() {
    let mut ipam = Ipam::new();
    let large = create_typed(&mut ipam, "22.0.0.0/8", PrefixType::Container);
    for cidr in ["22.0.0.0/12", "22.16.0.0/12", "22.32.0.0/12", "22.48.0.0/12"] {
        create(&mut ipam, cidr);
    }
    let u = ipam.get_utilization(large.id).unwrap();
    assert_eq!((u.used, u.total), (4_194_304, 16_777_216));
    create(&mut ipam, "22.64.0.0/10");
    let u = ipam.get_utilization(large.id).unwrap();
    assert_eq!((u.used, u.total), (8_388_608, 16_777_216));
    create(&mut ipam, "22.128.0.0/9");
    let u = ipam.get_utilization(large.id).unwrap();
    assert_eq!((u.used, u.total), (16_777_216, 16_777_216));

    let large_v6 = create_typed(&mut ipam, "ab00::/8", PrefixType::Container);
    for cidr in ["ab00::/12", "ab10::/12", "ab20::/12", "ab30::/12"] {
        create(&mut ipam, cidr);
    }
    let u = ipam.get_utilization(large_v6.id).unwrap();
    assert_eq!((u.used, u.total), (1u128 << 118, 1u128 << 120));
    create(&mut ipam, "ab40::/10");
    let u = ipam.get_utilization(large_v6.id).unwrap();
    assert_eq!((u.used, u.total), (1u128 << 119, 1u128 << 120));
    create(&mut ipam, "ab80::/9");
    let u = ipam.get_utilization(large_v6.id).unwrap();
    assert_eq!((u.used, u.total), (1u128 << 120, 1u128 << 120));

    let everything = create_typed(&mut ipam, "::/0", PrefixType::Container);
    let u = ipam.get_utilization(everything.id).unwrap();
    assert_eq!(u.total, u128::MAX, "saturates for the full IPv6 space");
}

#[test]
fn test_duplicate_prefix_rejected() {
    let mut ipam = Ipam::new();
    create(&mut ipam, "192.0.2.0/24");
    let err = ipam
        .create_prefix(PrefixAttrs::parse("192.0.2.0/24").unwrap())
        .unwrap_err();
    assert!(matches!(err, IpamError::Uniqueness { .. }), "got {err}");
    assert!(err.to_string().contains("192.0.2.0/24"), "names the value: {err}");
}

#[test]
fn test_duplicate_addresses_and_roles() {
    let mut ipam = Ipam::new();
    let first = ipam
        .create_ip_address(IpAddressAttrs::parse("192.0.2.1/24").unwrap())
        .unwrap();
    let err = ipam
        .create_ip_address(IpAddressAttrs::parse("192.0.2.1/24").unwrap())
        .unwrap_err();
    assert!(matches!(err, IpamError::Uniqueness { .. }), "got {err}");

    let loopback = ipam
        .create_ip_address(
            IpAddressAttrs::parse("192.0.2.1/24")
                .unwrap()
                .with_role(IpAddressRole::Loopback),
        )
        .unwrap();
    let secondary = ipam
        .create_ip_address(
            IpAddressAttrs::parse("192.0.2.1/24")
                .unwrap()
                .with_role(IpAddressRole::Secondary),
        )
        .unwrap();
    let mut dups: Vec<_> = ipam
        .get_duplicates(first.id)
        .unwrap()
        .iter()
        .map(|a| a.id)
        .collect();
    dups.sort();
    assert_eq!(dups, vec![loopback.id, secondary.id]);
}

#[test]
fn test_nat_outside_list_order() {
    let mut ipam = Ipam::new();
    let inside = ipam
        .create_ip_address(IpAddressAttrs::parse("192.168.0.1/24").unwrap())
        .unwrap();
    let mut outside = Vec::new();
    for host in 1..=3 {
        let attrs = IpAddressAttrs::parse(&format!("192.0.2.{host}/24"))
            .unwrap()
            .nat_inside(inside.id);
        outside.push(ipam.create_ip_address(attrs).unwrap().id);
    }
    let listed: Vec<_> = ipam
        .nat_outside_list(inside.id)
        .unwrap()
        .iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(listed, outside);

    // self reference is rejected and leaves the address untouched
    let attrs = IpAddressAttrs::parse("192.0.2.2/24").unwrap().nat_inside(outside[1]);
    let err = ipam.update_ip_address(outside[1], attrs).unwrap_err();
    assert!(matches!(err, IpamError::Containment(_)), "got {err}");
    assert_eq!(ipam.nat_inside(outside[1]).unwrap().map(|a| a.id), Some(inside.id));
}

#[test]
fn test_update_keeps_nat_outside_position() {
    let mut ipam = Ipam::new();
    let inside = ipam
        .create_ip_address(IpAddressAttrs::parse("192.168.0.1/24").unwrap())
        .unwrap();
    let other_inside = ipam
        .create_ip_address(IpAddressAttrs::parse("192.168.0.2/24").unwrap())
        .unwrap();
    let mut outside = Vec::new();
    for host in 1..=3 {
        let attrs = IpAddressAttrs::parse(&format!("198.51.100.{host}/24"))
            .unwrap()
            .nat_inside(inside.id);
        outside.push(ipam.create_ip_address(attrs).unwrap().id);
    }
    let listed = |ipam: &Ipam, id: IpAddressId| -> Vec<IpAddressId> {
        ipam.nat_outside_list(id).unwrap().iter().map(|a| a.id).collect()
    };

    let mut attrs = IpAddressAttrs::parse("198.51.100.1/24")
        .unwrap()
        .nat_inside(inside.id);
    attrs.description = "edge uplink".to_string();
    let updated = ipam.update_ip_address(outside[0], attrs).unwrap();
    assert_eq!(updated.description, "edge uplink");
    assert_eq!(listed(&ipam, inside.id), outside, "description edit keeps the order");

    // the inside address itself keeps its list across an update
    let mut attrs = IpAddressAttrs::parse("192.168.0.1/24").unwrap();
    attrs.dns_name = "nat-gw".to_string();
    ipam.update_ip_address(inside.id, attrs).unwrap();
    assert_eq!(listed(&ipam, inside.id), outside);

    // moving to another inside does change both lists
    let attrs = IpAddressAttrs::parse("198.51.100.1/24")
        .unwrap()
        .nat_inside(other_inside.id);
    ipam.update_ip_address(outside[0], attrs).unwrap();
    assert_eq!(listed(&ipam, inside.id), vec![outside[1], outside[2]]);
    assert_eq!(listed(&ipam, other_inside.id), vec![outside[0]]);
}

#[test]
fn test_bulk_create_rolls_back() {
    let mut ipam = Ipam::new();
    let parent = create(&mut ipam, "192.0.2.0/24");
    add_ip(&mut ipam, "192.0.2.4/24");
    let template = IpAddressAttrs::parse("192.0.2.0/24").unwrap();

    let err = ipam
        .bulk_create_ip_addresses("192.0.2.[1-5]/24", template.clone())
        .unwrap_err();
    assert!(matches!(err, IpamError::Uniqueness { .. }), "got {err}");
    assert_eq!(ipam.get_child_ips(parent.id).unwrap().len(), 1, "nothing was kept");

    let created = ipam
        .bulk_create_ip_addresses("192.0.2.[1-3,5]/24", template)
        .unwrap();
    assert_eq!(created.len(), 4);
    assert!(created.iter().all(|a| a.parent == Some(parent.id)));
    assert_eq!(ipam.get_first_available_ip(parent.id).unwrap().to_string(), "192.0.2.6/24");
}

#[test]
fn test_bulk_delete_prefixes_is_atomic() {
    let (mut ipam, root, parent, child1, _child2) = tree_fixture();
    let err = ipam
        .bulk_delete_prefixes(&[child1.id, PrefixId(9999)])
        .unwrap_err();
    assert!(matches!(err, IpamError::NotFound { .. }), "got {err}");
    assert!(ipam.get_prefix(child1.id).is_ok(), "rolled back");

    assert_eq!(ipam.bulk_delete_prefixes(&[parent.id, child1.id]).unwrap(), 2);
    assert_eq!(ipam.children(root.id).unwrap().len(), 1);
}

#[test]
fn test_next_available_vid() {
    let mut ipam = Ipam::new();
    let group = ipam
        .create_vlan_group(VlanGroupAttrs::new("VLAN Group 1"))
        .unwrap();
    assert_eq!(group.slug, "vlan-group-1");
    for vid in [1, 2, 3, 5] {
        ipam.create_vlan(VlanAttrs::new(vid, &format!("VLAN {vid}")).in_group(group.id))
            .unwrap();
    }
    assert_eq!(ipam.next_available_vid(group.id).unwrap(), 4);
    ipam.create_vlan(VlanAttrs::new(4, "VLAN 4").in_group(group.id))
        .unwrap();
    assert_eq!(ipam.next_available_vid(group.id).unwrap(), 6);

    let err = ipam
        .create_vlan(VlanAttrs::new(4, "VLAN four").in_group(group.id))
        .unwrap_err();
    assert!(matches!(err, IpamError::Uniqueness { .. }), "got {err}");
    let vids: Vec<u16> = ipam
        .vlans_in_group(group.id)
        .unwrap()
        .iter()
        .map(|v| v.vid)
        .collect();
    assert_eq!(vids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_location_type_validation() {
    let mut ipam = Ipam::new();
    let elevator = ipam
        .create_location_type(LocationTypeAttrs::new("Elevator", &[]))
        .unwrap();
    let location = ipam
        .create_location(LocationAttrs::new("Elevator 1", elevator.id))
        .unwrap();

    let err = ipam
        .create_vlan_group(VlanGroupAttrs::new("Group 1").at_location(location.id))
        .unwrap_err();
    assert!(
        err.to_string()
            .contains("VLAN groups may not associate to locations of type \"Elevator\""),
        "got {err}"
    );

    let err = ipam
        .create_prefix(PrefixAttrs::parse("10.0.0.0/24").unwrap().at_location(location.id))
        .unwrap_err();
    assert!(err.to_string().contains("Prefixes may not associate"), "got {err}");

    let err = ipam
        .create_vlan(VlanAttrs::new(1, "Group 1").at_location(location.id))
        .unwrap_err();
    assert!(err.to_string().contains("VLANs may not associate"), "got {err}");
}

#[test]
fn test_vlan_location_within_group_location() {
    let mut ipam = Ipam::new();
    let kinds = [ContentKind::Prefix, ContentKind::VlanGroup, ContentKind::Vlan];
    let region = ipam
        .create_location_type(LocationTypeAttrs::new("Region", &kinds))
        .unwrap();
    let site = ipam
        .create_location_type(LocationTypeAttrs::new("Site", &kinds).with_parent(region.id))
        .unwrap();
    let east = ipam.create_location(LocationAttrs::new("East", region.id)).unwrap();
    let west = ipam.create_location(LocationAttrs::new("West", region.id)).unwrap();
    let east_dc = ipam
        .create_location(LocationAttrs::new("East DC", site.id).with_parent(east.id))
        .unwrap();

    let group = ipam
        .create_vlan_group(VlanGroupAttrs::new("East VLANs").at_location(east.id))
        .unwrap();
    ipam.create_vlan(
        VlanAttrs::new(100, "servers")
            .in_group(group.id)
            .at_location(east_dc.id),
    )
    .expect("a descendant location is within the group's location");

    let err = ipam
        .create_vlan(VlanAttrs::new(101, "web").in_group(group.id).at_location(west.id))
        .unwrap_err();
    assert!(
        err.to_string().contains(
            "The assigned group belongs to a location that does not include location \"West\""
        ),
        "got {err}"
    );

    let err = ipam
        .create_location(LocationAttrs::new("Orphan DC", site.id))
        .unwrap_err();
    assert!(matches!(err, IpamError::Containment(_)), "got {err}");
}

#[test]
fn test_snapshot_save_and_load() {
    let path = std::env::temp_dir().join(format!("ipam_engine_it_{}.json", std::process::id()));
    let (mut ipam, root, parent, child1, _child2) = tree_fixture();
    add_ip(&mut ipam, "101.102.0.10/26");
    ipam.save_snapshot(&path).expect("Failed to write snapshot");

    // records are stored as packed bytes plus prefix length
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let stored = &json["prefixes"][child1.id.0.to_string()]["prefix"];
    assert_eq!(stored["value"], serde_json::json!([101, 102, 0, 0]));
    assert_eq!(stored["prefix_len"], 26);

    let loaded = Ipam::load_snapshot(&path, EngineConfig::default()).expect("Failed to load");
    let _ = std::fs::remove_file(&path);

    let ns = loaded.default_namespace();
    assert_eq!(loaded.prefixes(ns).len(), 4);
    assert_eq!(loaded.get_prefix(child1.id).unwrap().parent, Some(parent.id));
    assert_eq!(
        ids(&loaded.descendants(root.id, false).unwrap()),
        ids(&ipam.descendants(root.id, false).unwrap())
    );
    assert_eq!(loaded.get_child_ips(child1.id).unwrap().len(), 1);

    // ids keep counting after the highest stored id
    let mut loaded = loaded;
    let next = create(&mut loaded, "101.102.0.128/25");
    assert!(next.id.0 > child1.id.0);
}
