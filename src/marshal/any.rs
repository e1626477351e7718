//! Generic Value Marshaler
//!
//! Maps any [`ToValue`] onto the wire grammar, recursing into sequences and
//! maps. Nested elements are encoded through [`Pool::encode_tail`] so each
//! sub-encode writes in place after the bytes already accumulated.

use crate::marshal::value::{ToValue, Value};
use crate::protocol::error::{RespError, RespResult};
use crate::protocol::pool::Pool;
use crate::protocol::scalar::Marshal;
use crate::protocol::types::{prefix, BOOLS, NIL_ARRAY, NIL_BULK_STRING};
use bytes::Bytes;
use std::fmt;
use std::io::Write;

/// Maximum number of nullable references followed before giving up.
pub const MAX_POINTER_HOPS: usize = 8;

/// Appends the wire form of `value` to `pool`.
pub(crate) fn encode_value(value: Value<'_>, pool: &mut Pool) -> RespResult<()> {
    let value = follow_refs(value)?;

    match value {
        Value::Bytes(b) => pool.write_bulk(b),
        Value::Str(s) => pool.write_bulk(s.as_bytes()),
        Value::Bool(b) => pool.write_bulk(BOOLS[b as usize]),
        Value::F32(x) => write_float(pool, f64::from(x), &x),
        Value::F64(x) => write_float(pool, x, &x),
        Value::Nil | Value::Ref(None) => pool.write(NIL_BULK_STRING),
        Value::Int(n) => pool.write_int_line(prefix::INTEGER, n),
        Value::UInt(n) => {
            let n = i64::try_from(n).map_err(|_| RespError::IntegerOverflow(n))?;
            pool.write_int_line(prefix::INTEGER, n);
        }
        Value::Error(e) => pool.write_display_line(prefix::ERROR, &e)?,
        Value::Marshaler(m) => m.marshal_into(pool)?,
        Value::Text(t) => {
            let data = t.marshal_text().map_err(RespError::Delegate)?;
            pool.write_bulk(&data);
        }
        Value::Binary(b) => {
            let data = b.marshal_binary().map_err(RespError::Delegate)?;
            pool.write_bulk(&data);
        }
        Value::Seq(None) | Value::Map(None) => pool.write(NIL_ARRAY),
        Value::Seq(Some(elements)) => {
            pool.write_int_line(prefix::ARRAY, elements.len() as i64);
            for item in elements {
                pool.encode_tail(|tail| encode_value(item.to_value(), tail))?;
            }
        }
        Value::Map(Some(entries)) => {
            pool.write_int_line(prefix::ARRAY, 2 * entries.len() as i64);
            for (key, val) in entries {
                pool.encode_tail(|tail| encode_value(key.to_value(), tail))?;
                pool.encode_tail(|tail| encode_value(val.to_value(), tail))?;
            }
        }
        Value::Unsupported(name) => return Err(RespError::UnsupportedType(name)),
        // Resolved by follow_refs.
        Value::Ref(Some(_)) => return Err(RespError::PointerDepth(MAX_POINTER_HOPS)),
    }
    Ok(())
}

/// Dereferences `Value::Ref` until a non-reference or a nil reference.
pub(crate) fn follow_refs(mut value: Value<'_>) -> RespResult<Value<'_>> {
    let mut hops = 0;
    while let Value::Ref(Some(inner)) = value {
        if hops == MAX_POINTER_HOPS {
            return Err(RespError::PointerDepth(MAX_POINTER_HOPS));
        }
        hops += 1;
        value = inner.to_value();
    }
    Ok(value)
}

/// Writes a float as a bulk string.
///
/// Finite values use the shortest decimal that round-trips, never an
/// exponent. Infinities are `+Inf` and `-Inf`.
fn write_float(pool: &mut Pool, x: f64, exact: &dyn fmt::Display) {
    let mark = pool.scratch_mark();
    let scratch = pool.scratch_mut();
    if x.is_nan() {
        scratch.extend_from_slice(b"NaN");
    } else if x.is_infinite() {
        scratch.extend_from_slice(if x > 0.0 { b"+Inf" } else { b"-Inf" });
    } else {
        let _ = write!(scratch, "{}", exact);
    }
    pool.write_bulk_from_scratch(mark);
}

/// Adapts any [`ToValue`] to the [`Marshal`] contract.
///
/// ```
/// use flashresp::marshal::Any;
/// use flashresp::protocol::Marshal;
///
/// let frame = Any(&vec!["a", "b"]).marshal(None).unwrap();
/// assert_eq!(&frame[..], b"*2\r\n$1\r\na\r\n$1\r\nb\r\n");
/// ```
#[derive(Clone, Copy)]
pub struct Any<'a>(pub &'a dyn ToValue);

impl Marshal for Any<'_> {
    fn marshal_into(&self, pool: &mut Pool) -> RespResult<()> {
        encode_value(self.0.to_value(), pool)
    }
}

impl fmt::Debug for Any<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Any").field(&self.0.to_value()).finish()
    }
}

/// Encodes `value` as one standalone frame, reusing `pool` when given.
///
/// On error the pool's output is cleared; no partial frame is returned.
pub fn marshal_any<T: ToValue + ?Sized>(value: &T, pool: Option<&mut Pool>) -> RespResult<Bytes> {
    let mut pool = Pool::acquire(pool);
    if let Err(e) = encode_value(value.to_value(), &mut pool) {
        pool.reset();
        return Err(e);
    }
    Ok(pool.take_output())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::value::{Dynamic, MarshalBinary, MarshalText, Nullable};
    use crate::protocol::decode::decode_one;
    use crate::protocol::error::BoxError;
    use crate::protocol::scalar::{BulkString, Integer, SimpleString};
    use crate::protocol::types::RespValue;
    use std::collections::{BTreeMap, HashMap};
    use std::io;

    fn marshal<T: ToValue + ?Sized>(value: &T) -> Vec<u8> {
        marshal_any(value, None).unwrap().to_vec()
    }

    #[test]
    fn test_empty_sequence() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(marshal(&empty), b"*0\r\n");
    }

    #[test]
    fn test_string_sequence() {
        assert_eq!(marshal(&["a", "b"]), b"*2\r\n$1\r\na\r\n$1\r\nb\r\n");
        assert_eq!(
            marshal(&vec!["a".to_string(), "b".to_string()]),
            b"*2\r\n$1\r\na\r\n$1\r\nb\r\n"
        );
    }

    #[test]
    fn test_nil() {
        assert_eq!(marshal(&()), b"$-1\r\n");
        assert_eq!(marshal(&None::<String>), b"$-1\r\n");
    }

    #[test]
    fn test_error_message() {
        let err = io::Error::new(io::ErrorKind::Other, ":(");
        assert_eq!(marshal(&err), b"-:(\r\n");

        let boxed: BoxError = ":(".into();
        assert_eq!(marshal(&boxed), b"-:(\r\n");
    }

    #[test]
    fn test_multiline_error_message_is_rejected() {
        let err = io::Error::new(io::ErrorKind::Other, "first\r\nsecond");
        let result = marshal_any(&vec![err], None);
        assert!(matches!(result, Err(RespError::LineBreak(5))));
    }

    #[test]
    fn test_text_and_bytes() {
        assert_eq!(marshal("foo\r\nbar"), b"$8\r\nfoo\r\nbar\r\n");
        assert_eq!(marshal(&b"raw"[..]), b"$3\r\nraw\r\n");
        assert_eq!(marshal(&Bytes::from_static(b"")), b"$0\r\n\r\n");
    }

    #[test]
    fn test_bools() {
        assert_eq!(marshal(&true), b"$1\r\n1\r\n");
        assert_eq!(marshal(&false), b"$1\r\n0\r\n");
    }

    #[test]
    fn test_floats() {
        assert_eq!(marshal(&5.5f64), b"$3\r\n5.5\r\n");
        assert_eq!(marshal(&0.1f32), b"$3\r\n0.1\r\n");
        assert_eq!(marshal(&1e21f64), b"$22\r\n1000000000000000000000\r\n");
        assert_eq!(marshal(&f64::INFINITY), b"$4\r\n+Inf\r\n");
        assert_eq!(marshal(&f64::NEG_INFINITY), b"$4\r\n-Inf\r\n");
        assert_eq!(marshal(&f64::NAN), b"$3\r\nNaN\r\n");
    }

    #[test]
    fn test_integers() {
        assert_eq!(marshal(&42i32), b":42\r\n");
        assert_eq!(marshal(&-7i64), b":-7\r\n");
        assert_eq!(marshal(&255u8), b":255\r\n");
        assert_eq!(marshal(&(i64::MAX as u64)), b":9223372036854775807\r\n");
    }

    #[test]
    fn test_unsigned_overflow() {
        let err = marshal_any(&u64::MAX, None).unwrap_err();
        assert!(matches!(err, RespError::IntegerOverflow(u64::MAX)));
    }

    #[test]
    fn test_custom_marshalers_win() {
        assert_eq!(marshal(&SimpleString::new("OK")), b"+OK\r\n");
        assert_eq!(marshal(&BulkString::nil()), b"$-1\r\n");
        assert_eq!(marshal(&Integer::default()), b":0\r\n");
        assert_eq!(
            marshal(&RespValue::array(vec![RespValue::integer(1), RespValue::NullArray])),
            b"*2\r\n:1\r\n*-1\r\n"
        );
    }

    struct Greeting(&'static str);

    impl MarshalText for Greeting {
        fn marshal_text(&self) -> Result<Vec<u8>, BoxError> {
            if self.0.is_empty() {
                return Err("empty greeting".into());
            }
            Ok(format!("{}_", self.0).into_bytes())
        }
    }

    impl ToValue for Greeting {
        fn to_value(&self) -> Value<'_> {
            Value::Text(self)
        }
    }

    struct Packed(u32);

    impl MarshalBinary for Packed {
        fn marshal_binary(&self) -> Result<Vec<u8>, BoxError> {
            Ok(self.0.to_be_bytes().to_vec())
        }
    }

    impl ToValue for Packed {
        fn to_value(&self) -> Value<'_> {
            Value::Binary(self)
        }
    }

    #[test]
    fn test_text_marshaler() {
        assert_eq!(marshal(&Greeting("ohey")), b"$5\r\nohey_\r\n");
    }

    #[test]
    fn test_text_marshaler_failure_is_passed_through() {
        let err = marshal_any(&Greeting(""), None).unwrap_err();
        assert!(matches!(err, RespError::Delegate(_)));
        assert_eq!(err.to_string(), "empty greeting");
    }

    #[test]
    fn test_binary_marshaler() {
        assert_eq!(marshal(&Packed(0x0d0a_0d0a)), b"$4\r\n\r\n\r\n\r\n");
    }

    #[test]
    fn test_nested_sequences() {
        let nested = vec![vec![1i64, 2], vec![], vec![3]];
        assert_eq!(
            marshal(&nested),
            b"*3\r\n*2\r\n:1\r\n:2\r\n*0\r\n*1\r\n:3\r\n"
        );
    }

    #[test]
    fn test_nested_output_decodes() {
        let nested = vec![
            vec!["x".repeat(100), String::new()],
            vec!["y".repeat(3000)],
        ];
        let frame = marshal_any(&nested, None).unwrap();
        let value = decode_one(&mut &frame[..], None).unwrap();
        let outer = value.into_array().unwrap();
        assert_eq!(outer.len(), 2);
        assert_eq!(outer[0].as_array().unwrap()[0].as_bytes().unwrap().len(), 100);
        assert_eq!(outer[0].as_array().unwrap()[1].as_bytes().unwrap(), b"");
        assert_eq!(outer[1].as_array().unwrap()[0].as_bytes().unwrap().len(), 3000);
    }

    #[test]
    fn test_map_entries_are_flattened() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), 1i64);
        map.insert("b".to_string(), 2i64);

        let frame = marshal_any(&map, None).unwrap();
        let items = decode_one(&mut &frame[..], None).unwrap().into_array().unwrap();
        assert_eq!(items.len(), 4);

        let mut pairs: Vec<(Vec<u8>, i64)> = items
            .chunks(2)
            .map(|kv| (kv[0].as_bytes().unwrap().to_vec(), kv[1].as_integer().unwrap()))
            .collect();
        pairs.sort();
        assert_eq!(pairs, vec![(b"a".to_vec(), 1), (b"b".to_vec(), 2)]);
    }

    #[test]
    fn test_ordered_map() {
        let mut map = BTreeMap::new();
        map.insert(1u16, "one");
        assert_eq!(marshal(&map), b"*2\r\n:1\r\n$3\r\none\r\n");
    }

    #[test]
    fn test_nil_containers() {
        assert_eq!(marshal(&Nullable::<Vec<i64>>(None)), b"*-1\r\n");
        assert_eq!(marshal(&Nullable::<HashMap<String, i64>>(None)), b"*-1\r\n");
        assert_eq!(marshal(&Nullable(Some(Vec::<i64>::new()))), b"*0\r\n");
    }

    #[test]
    fn test_references_are_followed() {
        assert_eq!(marshal(&Some(Some(Some(7i64)))), b":7\r\n");
        assert_eq!(marshal(&Some(None::<i64>)), b"$-1\r\n");
        assert_eq!(marshal(&Box::new("boxed")), b"$5\r\nboxed\r\n");
    }

    struct SelfRef;

    impl ToValue for SelfRef {
        fn to_value(&self) -> Value<'_> {
            Value::Ref(Some(self))
        }
    }

    #[test]
    fn test_reference_cycle_is_bounded() {
        let err = marshal_any(&SelfRef, None).unwrap_err();
        assert!(matches!(err, RespError::PointerDepth(MAX_POINTER_HOPS)));
    }

    #[test]
    fn test_unsupported_dynamic_type() {
        struct Opaque;
        let values: Vec<Box<dyn Dynamic>> = vec![Box::new(1i64), Box::new(Opaque)];
        let err = marshal_any(&values, None).unwrap_err();
        match err {
            RespError::UnsupportedType(name) => assert!(name.ends_with("Opaque")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_dynamic_values() {
        let values: Vec<Box<dyn Dynamic>> = vec![
            Box::new("a".to_string()),
            Box::new(2u32),
            Box::new(vec![1u8, 2]),
        ];
        assert_eq!(marshal(&values), b"*3\r\n$1\r\na\r\n:2\r\n$2\r\n\x01\x02\r\n");
    }

    #[test]
    fn test_failed_element_discards_partial_frame() {
        let mut pool = Pool::new();
        let err = marshal_any(&vec![Some(1u64), Some(u64::MAX)], Some(&mut pool)).unwrap_err();
        assert!(matches!(err, RespError::IntegerOverflow(_)));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_pool_reused_across_calls() {
        let mut pool = Pool::new();
        let first = marshal_any(&vec!["one", "two"], Some(&mut pool)).unwrap();
        let second = marshal_any("three", Some(&mut pool)).unwrap();
        let third = marshal_any(&3i64, Some(&mut pool)).unwrap();

        assert_eq!(&first[..], b"*2\r\n$3\r\none\r\n$3\r\ntwo\r\n");
        assert_eq!(&second[..], b"$5\r\nthree\r\n");
        assert_eq!(&third[..], b":3\r\n");
    }

    #[test]
    fn test_any_adapter() {
        let frame = Any(&vec![1i64]).marshal(None).unwrap();
        assert_eq!(&frame[..], b"*1\r\n:1\r\n");
    }

    #[test]
    fn test_marshaled_output_round_trips() {
        let value = RespValue::array(vec![
            RespValue::bulk_string("foo\r\nbar"),
            RespValue::NullBulkString,
            RespValue::error("ERR nope"),
        ]);
        let frame = marshal_any(&value, None).unwrap();
        assert_eq!(decode_one(&mut &frame[..], None).unwrap(), value);
    }
}
