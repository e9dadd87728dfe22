/// A network with a default public endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KnownNetwork {
    /// `eip155` chain reference (the numeric chain id).
    pub reference: u64,
    pub name: &'static str,
    pub default_rpc: &'static str,
}

/// Networks usable without a configured RPC endpoint.
pub const KNOWN_NETWORKS: &[KnownNetwork] = &[
    KnownNetwork {
        reference: 1,
        name: "mainnet",
        default_rpc: "https://ethereum-rpc.publicnode.com",
    },
    KnownNetwork {
        reference: 5,
        name: "goerli",
        default_rpc: "https://ethereum-goerli-rpc.publicnode.com",
    },
    KnownNetwork {
        reference: 11_155_111,
        name: "sepolia",
        default_rpc: "https://ethereum-sepolia-rpc.publicnode.com",
    },
    KnownNetwork {
        reference: 100,
        name: "gnosis",
        default_rpc: "https://rpc.gnosischain.com",
    },
    KnownNetwork {
        reference: 1337,
        name: "local",
        default_rpc: "http://127.0.0.1:8545",
    },
];

/// Find a network by its chain reference string (`"1"`, `"100"`, ...).
pub fn lookup_network(reference: &str) -> Option<&'static KnownNetwork> {
    let reference: u64 = reference.parse().ok()?;
    KNOWN_NETWORKS.iter().find(|n| n.reference == reference)
}
