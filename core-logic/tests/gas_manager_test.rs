use core_logic::{GasConfig, GasConfigToml};

#[test]
fn test_bump_is_twenty_percent_by_default() {
    let gas = GasConfig::default();
    assert_eq!(gas.bumped(1_000_000_000), 1_200_000_000);
    assert_eq!(gas.bumped(0), 0);
}

#[test]
fn test_bump_never_lowers_price() {
    let gas = GasConfig::new().with_bump_percent(50);
    assert_eq!(gas.bumped(1_000), 1_000);
}

#[test]
fn test_toml_conversion() {
    let raw = GasConfigToml {
        bump_percent: None,
        price_override_gwei: Some(1.5),
    };
    let gas: GasConfig = raw.into();
    assert_eq!(gas.bump_percent, 120);
    assert_eq!(gas.price_override_wei(), Some(1_500_000_000));
}
