use std::fmt;
use std::iter::{Product, Sum};
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RulesError};

/// An exact rational number, always in lowest terms with a positive denominator.
///
/// Probabilities are kept as fractions so that repeated splitting, merging and
/// renormalizing never drifts. Numerator and denominator are arbitrary precision, so
/// no input can overflow them.
///
/// Because the representation is canonical, the derived `PartialEq`/`Hash` agree
/// with numeric equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fraction(BigRational);

impl Fraction {
    /// Build `numerator / denominator`, reduced. A zero denominator is rejected.
    pub fn new(numerator: impl Into<BigInt>, denominator: impl Into<BigInt>) -> Result<Self> {
        let (numerator, denominator) = (numerator.into(), denominator.into());
        if denominator.is_zero() {
            return Err(RulesError::invalid_value(format!(
                "fraction {numerator}/0 has a zero denominator"
            )));
        }
        Ok(Fraction(BigRational::new(numerator, denominator)))
    }

    #[inline]
    pub fn zero() -> Self {
        Fraction(BigRational::zero())
    }

    #[inline]
    pub fn one() -> Self {
        Fraction(BigRational::one())
    }

    pub fn from_integer(n: impl Into<BigInt>) -> Self {
        Fraction(BigRational::from_integer(n.into()))
    }

    #[inline]
    pub fn numerator(&self) -> &BigInt {
        self.0.numer()
    }

    #[inline]
    pub fn denominator(&self) -> &BigInt {
        self.0.denom()
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Floating point approximation. Presentation and qubit heuristics only.
    pub fn value(&self) -> f64 {
        // Keep the denominator inside f64 range.
        let shift = self.0.denom().bits().saturating_sub(1000);
        let n = self.0.numer() >> shift;
        let d = self.0.denom() >> shift;
        match (n.to_f64(), d.to_f64()) {
            (Some(n), Some(d)) => n / d,
            _ => f64::NAN,
        }
    }

    pub fn reciprocal(&self) -> Result<Self> {
        if self.is_zero() {
            return Err(RulesError::DivisionByZero);
        }
        Ok(Fraction(self.0.recip()))
    }

    pub fn divide(&self, rhs: &Fraction) -> Result<Self> {
        Ok(self * &rhs.reciprocal()?)
    }

    pub fn less_than(&self, rhs: &Fraction) -> bool {
        self < rhs
    }

    pub fn less_than_or_equal(&self, rhs: &Fraction) -> bool {
        self <= rhs
    }

    pub fn equal_to(&self, rhs: &Fraction) -> bool {
        self == rhs
    }

    /// N-ary sum, exact for any number of terms.
    pub fn sum_of<I>(values: I) -> Fraction
    where
        I: IntoIterator<Item = Fraction>,
    {
        values
            .into_iter()
            .fold(Fraction::zero(), |acc, f| acc + f)
    }

    pub fn product_of<I>(values: I) -> Fraction
    where
        I: IntoIterator<Item = Fraction>,
    {
        values.into_iter().fold(Fraction::one(), |acc, f| acc * f)
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Fraction::zero()
    }
}

impl From<i128> for Fraction {
    fn from(n: i128) -> Self {
        Fraction::from_integer(n)
    }
}

macro_rules! forward_binop {
    ($imp:ident, $method:ident) => {
        impl $imp<Fraction> for Fraction {
            type Output = Fraction;

            fn $method(self, rhs: Fraction) -> Fraction {
                Fraction(self.0.$method(rhs.0))
            }
        }

        impl<'a> $imp<&'a Fraction> for Fraction {
            type Output = Fraction;

            fn $method(self, rhs: &'a Fraction) -> Fraction {
                Fraction(self.0.$method(&rhs.0))
            }
        }

        impl<'a> $imp<Fraction> for &'a Fraction {
            type Output = Fraction;

            fn $method(self, rhs: Fraction) -> Fraction {
                Fraction((&self.0).$method(rhs.0))
            }
        }

        impl<'a, 'b> $imp<&'b Fraction> for &'a Fraction {
            type Output = Fraction;

            fn $method(self, rhs: &'b Fraction) -> Fraction {
                Fraction((&self.0).$method(&rhs.0))
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);

macro_rules! forward_assign {
    ($imp:ident, $method:ident) => {
        impl $imp<Fraction> for Fraction {
            fn $method(&mut self, rhs: Fraction) {
                self.0.$method(rhs.0);
            }
        }

        impl<'a> $imp<&'a Fraction> for Fraction {
            fn $method(&mut self, rhs: &'a Fraction) {
                self.0.$method(&rhs.0);
            }
        }
    };
}

forward_assign!(AddAssign, add_assign);
forward_assign!(SubAssign, sub_assign);
forward_assign!(MulAssign, mul_assign);

impl Neg for Fraction {
    type Output = Fraction;

    fn neg(self) -> Fraction {
        Fraction(-self.0)
    }
}

impl Neg for &Fraction {
    type Output = Fraction;

    fn neg(self) -> Fraction {
        Fraction(-&self.0)
    }
}

impl Sum for Fraction {
    fn sum<I: Iterator<Item = Fraction>>(iter: I) -> Fraction {
        Fraction::sum_of(iter)
    }
}

impl<'a> Sum<&'a Fraction> for Fraction {
    fn sum<I: Iterator<Item = &'a Fraction>>(iter: I) -> Fraction {
        iter.fold(Fraction::zero(), |acc, f| acc + f)
    }
}

impl Product for Fraction {
    fn product<I: Iterator<Item = Fraction>>(iter: I) -> Fraction {
        Fraction::product_of(iter)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0.numer(), self.0.denom())
    }
}

impl FromStr for Fraction {
    type Err = RulesError;

    /// Accepts `n/d` or a bare integer `n`.
    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim()
                .parse::<BigInt>()
                .map_err(|e| RulesError::invalid_value(format!("bad fraction {s:?}: {e}")))
        };
        match s.split_once('/') {
            Some((n, d)) => Fraction::new(parse(n)?, parse(d)?),
            None => Ok(Fraction::from_integer(parse(s)?)),
        }
    }
}

impl TryFrom<String> for Fraction {
    type Error = RulesError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Fraction> for String {
    fn from(f: Fraction) -> String {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frac(n: i128, d: i128) -> Fraction {
        Fraction::new(n, d).unwrap()
    }

    #[test]
    fn construction_reduces_and_moves_sign_to_numerator() {
        let f = frac(6, -8);
        assert_eq!(*f.numerator(), BigInt::from(-3));
        assert_eq!(*f.denominator(), BigInt::from(4));
        assert_eq!(frac(0, -5), Fraction::zero());
        assert!(Fraction::zero().denominator().is_one());
    }

    #[test]
    fn zero_denominator_is_invalid_value() {
        assert!(matches!(
            Fraction::new(1, 0),
            Err(RulesError::InvalidValue { .. })
        ));
    }

    #[test]
    fn reciprocal_of_zero_fails() {
        assert_eq!(Fraction::zero().reciprocal(), Err(RulesError::DivisionByZero));
        assert_eq!(frac(-2, 3).reciprocal().unwrap(), frac(-3, 2));
    }

    #[test]
    fn arithmetic_is_exact() {
        assert_eq!(frac(1, 3) + frac(1, 6), frac(1, 2));
        assert_eq!(frac(1, 2) - frac(3, 4), frac(-1, 4));
        assert_eq!(frac(2, 3) * frac(9, 4), frac(3, 2));
        assert_eq!(frac(1, 2).divide(&frac(1, 4)).unwrap(), frac(2, 1));
        assert_eq!(-frac(1, 2), frac(-1, 2));
    }

    #[test]
    fn ordering_follows_value() {
        assert!(frac(1, 3).less_than(&frac(1, 2)));
        assert!(frac(-1, 2) < Fraction::zero());
        assert!(frac(2, 4).less_than_or_equal(&frac(1, 2)));
        assert!(frac(2, 4).equal_to(&frac(1, 2)));
    }

    #[test]
    fn nary_sum_and_product() {
        let parts = [frac(1, 2), frac(1, 3), frac(1, 6)];
        assert_eq!(parts.iter().sum::<Fraction>(), Fraction::one());
        assert_eq!(Fraction::product_of(parts), frac(1, 36));
        assert_eq!(Fraction::sum_of(Vec::new()), Fraction::zero());
    }

    #[test]
    fn huge_coprime_denominators_do_not_overflow() {
        let a: Fraction = "1/170141183460469231731687303715884105727".parse().unwrap();
        let b: Fraction = "1/170141183460469231731687303715884105725".parse().unwrap();
        let sum = &a + &b;
        assert!(sum.is_positive());
        assert!(sum < Fraction::one());
        assert_eq!(sum - b, a);
    }

    #[test]
    fn parses_and_displays() {
        assert_eq!("3/9".parse::<Fraction>().unwrap(), frac(1, 3));
        assert_eq!("7".parse::<Fraction>().unwrap(), frac(7, 1));
        assert_eq!(frac(1, 3).to_string(), "1/3");
        assert!("1/x".parse::<Fraction>().is_err());
        assert!("1/0".parse::<Fraction>().is_err());
    }
}
