use super::*;
use proptest::prelude::*;
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

#[test]
fn test_money_from_decimal_pads_to_scale() {
    let money = Money::from_decimal(dec!(100.5)).unwrap();
    assert_eq!(money.as_decimal().scale(), MONEY_SCALE);
    assert_eq!(money.to_string(), "100.5000");
}

#[test]
fn test_money_from_decimal_rejects_excess_precision() {
    let err = Money::from_decimal(dec!(1.00001)).unwrap_err();
    assert!(matches!(err, MoneyError::ExcessPrecision { scale: 4, .. }));
}

#[test]
fn test_money_from_decimal_accepts_trailing_zeros_beyond_scale() {
    let money = Money::from_decimal(dec!(1.500000)).unwrap();
    assert_eq!(money, Money::from_minor_units(15_000));
}

#[test]
fn test_money_out_of_range() {
    assert!(Money::from_decimal(dec!(999999999999999.9999)).is_ok());
    assert!(matches!(
        Money::from_decimal(dec!(1000000000000000)),
        Err(MoneyError::OutOfRange(_))
    ));
    assert!(Money::from_decimal(dec!(-999999999999999.9999)).is_ok());
}

#[test]
fn test_money_zero() {
    let money = Money::ZERO;
    assert!(money.is_zero());
    assert!(!money.is_negative());
    assert!(!money.is_positive());
    assert_eq!(Money::default(), Money::ZERO);
}

#[test]
fn test_money_negative() {
    let money = Money::from_decimal(dec!(-1.00)).unwrap();
    assert!(money.is_negative());
    assert_eq!(money.abs(), Money::from_minor_units(10_000));
    assert_eq!(-money, Money::from_minor_units(10_000));
}

#[test]
fn test_money_add_and_sub_are_exact() {
    let a = Money::from_str("0.1").unwrap();
    let b = Money::from_str("0.2").unwrap();
    assert_eq!(a + b, Money::from_str("0.3").unwrap());
    assert_eq!(b - a, a);

    let mut acc = Money::ZERO;
    acc += b;
    acc -= a;
    assert_eq!(acc, a);
}

#[test]
fn test_money_sum() {
    let amounts = [
        Money::from_minor_units(1),
        Money::from_minor_units(2),
        Money::from_minor_units(3),
    ];
    let by_ref: Money = amounts.iter().sum();
    let by_val: Money = amounts.into_iter().sum();
    assert_eq!(by_ref, Money::from_minor_units(6));
    assert_eq!(by_val, by_ref);
}

#[rstest]
#[case(dec!(1.00005), dec!(1.0000))]
#[case(dec!(1.00015), dec!(1.0002))]
#[case(dec!(1.00025), dec!(1.0002))]
#[case(dec!(-1.00015), dec!(-1.0002))]
#[case(dec!(2.49999), dec!(2.5000))]
fn test_round_from_uses_bankers_rounding(#[case] input: Decimal, #[case] expected: Decimal) {
    assert_eq!(Money::round_from(input).unwrap().as_decimal(), expected);
}

#[test]
fn test_mul_quantity_rounds_once() {
    let unit_price = Money::from_str("0.3333").unwrap();
    let total = unit_price.mul_quantity(dec!(3)).unwrap();
    assert_eq!(total, Money::from_str("0.9999").unwrap());

    let unit_price = Money::from_str("10.0001").unwrap();
    let total = unit_price.mul_quantity(dec!(0.5)).unwrap();
    assert_eq!(total.as_decimal(), dec!(5.0000));
}

#[test]
fn test_percentage() {
    let net = Money::from_str("1000").unwrap();
    assert_eq!(net.percentage(dec!(11)).unwrap(), Money::from_str("110").unwrap());
    assert_eq!(
        Money::from_str("0.0005").unwrap().percentage(dec!(50)).unwrap(),
        Money::from_str("0.0002").unwrap()
    );
}

#[test]
fn test_money_parse_errors() {
    assert!(matches!(Money::from_str("abc"), Err(MoneyError::Parse(_))));
    assert!(matches!(
        Money::from_str("1.23456"),
        Err(MoneyError::ExcessPrecision { .. })
    ));
}

#[test]
fn test_money_serde_as_string() {
    let money = Money::from_str("150").unwrap();
    let json = serde_json::to_string(&money).unwrap();
    assert_eq!(json, "\"150.0000\"");

    let back: Money = serde_json::from_str(&json).unwrap();
    assert_eq!(back, money);
    assert!(serde_json::from_str::<Money>("\"1.00001\"").is_err());
}

#[test]
fn test_money_min() {
    let a = Money::from_minor_units(5);
    let b = Money::from_minor_units(7);
    assert_eq!(a.min(b), a);
    assert_eq!(b.min(a), a);
}

#[test]
fn test_currency_display() {
    assert_eq!(format!("{}", Currency::Usd), "USD");
    assert_eq!(format!("{}", Currency::Idr), "IDR");
    assert_eq!(format!("{}", Currency::Eur), "EUR");
    assert_eq!(format!("{}", Currency::Sgd), "SGD");
    assert_eq!(format!("{}", Currency::Jpy), "JPY");
}

#[test]
fn test_currency_from_str() {
    assert_eq!(Currency::from_str("USD").unwrap(), Currency::Usd);
    assert_eq!(Currency::from_str("usd").unwrap(), Currency::Usd);
    assert_eq!(Currency::from_str("IDR").unwrap(), Currency::Idr);
    assert!(Currency::from_str("INVALID").is_err());
}

fn money_strategy() -> impl Strategy<Value = Money> {
    (-1_000_000_000_000_i64..1_000_000_000_000_i64).prop_map(Money::from_minor_units)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1: Addition is associative and exact**
    #[test]
    fn prop_addition_associative(a in money_strategy(), b in money_strategy(), c in money_strategy()) {
        prop_assert_eq!((a + b) + c, a + (b + c));
    }

    /// **Property 2: Subtraction undoes addition**
    #[test]
    fn prop_sub_inverts_add(a in money_strategy(), b in money_strategy()) {
        prop_assert_eq!((a + b) - b, a);
    }

    /// **Property 3: Every value stays at the money scale**
    #[test]
    fn prop_scale_is_fixed(a in money_strategy(), b in money_strategy(), q in 0_i64..1_000) {
        prop_assert_eq!((a + b).as_decimal().scale(), MONEY_SCALE);
        let product = a.mul_quantity(Decimal::new(q, 2)).unwrap();
        prop_assert_eq!(product.as_decimal().scale(), MONEY_SCALE);
    }

    /// **Property 4: Text form parses back to the same amount**
    #[test]
    fn prop_display_parses_back(a in money_strategy()) {
        prop_assert_eq!(Money::from_str(&a.to_string()).unwrap(), a);
    }
}
