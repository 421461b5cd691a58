#[cfg(test)]
mod test {
    use crate::error::PackError;
    use crate::options::PackOptions;
    use crate::types::{NdArray, Value};
    use crate::wire::{pack, unpack};
    use anyhow::Result;
    use itertools::Itertools;
    use rand::seq::SliceRandom;

    fn uncompressed() -> PackOptions {
        PackOptions {
            compressed: false,
            ..PackOptions::default()
        }
    }

    /// Packs `pre` as one list, compressed and not, and asserts both blobs
    /// decode to the identical value.
    fn verify(pre: &Vec<Value>) -> Result<()> {
        let value = Value::List(pre.clone());
        let plain = pack(&value, &uncompressed())?;
        let wrapped = pack(&value, &PackOptions::default())?;
        assert_eq!(
            unpack(&plain)?,
            value,
            "\n{:?}\n{:?}\n",
            pre,
            plain
        );
        assert_eq!(unpack(&wrapped)?, value);
        Ok(())
    }

    fn gen_null() -> Value {
        Value::Null
    }
    fn gen_int() -> Value {
        Value::Int(-123)
    }
    fn gen_bigint() -> Value {
        Value::from(99999999999999999999999999999999999999i128)
    }
    fn gen_float() -> Value {
        Value::Float(2.0 / 3.0)
    }
    fn gen_str() -> Value {
        Value::from("asdf")
    }
    fn gen_bytes() -> Value {
        Value::Bytes(b"some bytes".to_vec())
    }
    fn gen_list_depth3() -> Value {
        Value::List(vec![
            Value::from("asdf"),
            Value::List(vec![Value::Int(456), Value::Bytes(vec![0, 1, 2])]),
            Value::Int(123),
        ])
    }
    fn gen_tuple() -> Value {
        Value::Tuple(vec![Value::from("zxcv"), Value::Int(9)])
    }
    fn gen_map() -> Value {
        Value::Map(vec![
            (Value::from("a"), Value::Int(3)),
            (Value::from("b"), Value::Bytes(b"b".to_vec())),
        ])
    }
    fn gen_map_nontext_keys() -> Value {
        Value::Map(vec![
            (Value::Int(0), Value::List(vec![gen_map()])),
            (Value::from("b"), Value::from("bee")),
        ])
    }
    fn gen_array() -> Value {
        Value::Array(NdArray::from_vec(vec![1.0f64, 2.0 / 3.0, 4.0, 5.0]))
    }

    #[test]
    fn enc_then_dec() -> Result<()> {
        let mut rand_rng = rand::thread_rng();

        let gen_fns = [
            gen_null,
            gen_int,
            gen_bigint,
            gen_float,
            gen_str,
            gen_bytes,
            gen_list_depth3,
            gen_tuple,
            gen_map,
            gen_map_nontext_keys,
            gen_array,
        ];

        for mut gen_fns in gen_fns.iter().powerset() {
            let values = gen_fns.iter().map(|gen| gen()).collect::<Vec<_>>();
            verify(&values)?;

            gen_fns.shuffle(&mut rand_rng);
            let values = gen_fns.iter().map(|gen| gen()).collect::<Vec<_>>();
            verify(&values)?;
        }

        Ok(())
    }

    #[test]
    fn scalars_round_trip_standalone() -> Result<()> {
        for value in [
            gen_null(),
            gen_int(),
            gen_bigint(),
            gen_float(),
            gen_str(),
            gen_bytes(),
            gen_tuple(),
            gen_map(),
            gen_map_nontext_keys(),
            gen_array(),
        ] {
            assert_eq!(unpack(&pack(&value, &uncompressed())?)?, value);
            assert_eq!(unpack(&pack(&value, &PackOptions::default())?)?, value);
        }
        Ok(())
    }

    #[test]
    fn tuples_and_lists_keep_distinct_tags() -> Result<()> {
        let members = vec![Value::Int(1), Value::from("two")];
        let as_list = pack(&Value::List(members.clone()), &uncompressed())?;
        let as_tuple = pack(&Value::Tuple(members.clone()), &uncompressed())?;

        assert_eq!(&as_list[..7], b"00list_");
        assert_eq!(&as_tuple[..7], b"00tupl_");
        assert_eq!(&as_list[7..], &as_tuple[7..]);

        assert_eq!(unpack(&as_list)?, Value::List(members.clone()));
        assert_eq!(unpack(&as_tuple)?, Value::Tuple(members));
        Ok(())
    }

    #[test]
    fn nontext_keys_round_trip_with_their_types() -> Result<()> {
        let map = Value::Map(vec![
            (Value::Int(1), Value::from("one")),
            (Value::from("k"), Value::Int(2)),
            (Value::Float(1.5), Value::Null),
            (Value::Bytes(vec![0xff]), Value::Bool(true)),
        ]);
        let blob = pack(&map, &uncompressed())?;
        assert_eq!(&blob[..7], b"00dicB_");
        assert_eq!(unpack(&blob)?, map);
        Ok(())
    }

    #[test]
    fn text_keyed_map_of_primitives_stays_compact() -> Result<()> {
        let map = Value::Map(vec![
            (Value::from("0"), Value::Int(3)),
            (Value::from("b"), Value::from("bee")),
        ]);
        let blob = pack(&map, &uncompressed())?;
        assert_eq!(&blob[..7], b"00json_");
        assert_eq!(unpack(&blob)?, map);
        Ok(())
    }

    #[test]
    fn byte_blobs_in_maps_take_the_document_path() -> Result<()> {
        let map = Value::Map(vec![
            (Value::from("0"), Value::Int(3)),
            (Value::from("b"), Value::Bytes(b"b".to_vec())),
        ]);
        let blob = pack(&map, &uncompressed())?;
        assert_eq!(&blob[..7], b"00bson_");
        assert_eq!(unpack(&blob)?, map);
        Ok(())
    }

    #[test]
    fn nonfinite_floats_take_the_document_path() -> Result<()> {
        let blob = pack(&Value::Float(f64::INFINITY), &uncompressed())?;
        assert_eq!(&blob[..7], b"00bson_");
        assert_eq!(unpack(&blob)?, Value::Float(f64::INFINITY));

        let blob = pack(&Value::Float(f64::NAN), &uncompressed())?;
        assert_eq!(&blob[..7], b"00bson_");
        match unpack(&blob)? {
            Value::Float(f) => assert!(f.is_nan()),
            other => panic!("expected a float, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn unknown_tags_pass_through_verbatim() -> Result<()> {
        let foreign = b"00zzzz_opaque payload".to_vec();
        assert_eq!(unpack(&foreign)?, Value::Bytes(foreign.clone()));

        let tagless = b"just some bytes".to_vec();
        assert_eq!(unpack(&tagless)?, Value::Bytes(tagless.clone()));
        Ok(())
    }

    #[test]
    fn malformed_payloads_under_recognized_tags_are_rejected() {
        for blob in [
            &b"00json_{"[..],                   // truncated JSON
            &b"00bint_12a34"[..],               // non-decimal digits
            &b"00bson_\x01\x02"[..],            // truncated document
            &b"00list_\x05\x00\x00\x00\x00"[..], // document without the '_' slot
            &b"00nmpy_x"[..],                   // numeric header without a length
        ] {
            assert!(matches!(unpack(blob), Err(PackError::Malformed(_))));
        }
    }

    #[test]
    fn nesting_beyond_the_limit_fails_fast() -> Result<()> {
        fn deep_list(depth: usize) -> Value {
            let mut value = Value::Int(0);
            for _ in 0..depth {
                value = Value::List(vec![value]);
            }
            value
        }

        assert_eq!(
            unpack(&pack(&deep_list(5), &uncompressed())?)?,
            deep_list(5)
        );
        assert!(matches!(
            pack(&deep_list(300), &uncompressed()),
            Err(PackError::DepthLimit { .. })
        ));
        Ok(())
    }

    #[test]
    fn custom_depth_limits_are_honored() {
        let value = Value::List(vec![Value::List(vec![Value::List(vec![Value::Int(1)])])]);
        let tight = PackOptions {
            max_depth: 2,
            compressed: false,
            ..PackOptions::default()
        };
        assert!(matches!(
            pack(&value, &tight),
            Err(PackError::DepthLimit { max: 2 })
        ));
    }
}
