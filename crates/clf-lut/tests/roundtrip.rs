//! Read/write round trips over every node type and float encoding.

use approx::assert_relative_eq;
use clf_lut::{
    Array, BitDepth, ClfError, FloatEncoding, Lut1DParams, Lut3DParams, MatrixParams, NodeOp,
    ParseOptions, ProcessList, ProcessNode, WriteOptions,
};

const ALL_NODES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ProcessList id="all-nodes" name="every node" compCLFversion="3.0" inverseOf="other">
  <Description>All node types</Description>
  <InputDescriptor>scene linear</InputDescriptor>
  <OutputDescriptor>display</OutputDescriptor>
  <Info>
    <Copyright>none</Copyright>
  </Info>
  <Matrix id="m" inBitDepth="32f" outBitDepth="32f">
    <Description>offset matrix</Description>
    <Array dim="3 4">1.5 0 0 0.1 0 1 0 0 0 0 0.5 -0.02</Array>
  </Matrix>
  <Range inBitDepth="32f" outBitDepth="10i" style="noClamp">
    <minInValue>0</minInValue>
    <maxInValue>1</maxInValue>
    <minOutValue>64</minOutValue>
    <maxOutValue>940</maxOutValue>
  </Range>
  <ASC_CDL inBitDepth="10i" outBitDepth="32f" style="FwdNoClamp">
    <SOPNode>
      <Slope>1.1 1 0.9</Slope>
      <Offset>0.01 0 -0.01</Offset>
      <Power>1 1.2 1</Power>
    </SOPNode>
    <SatNode>
      <Saturation>0.8</Saturation>
    </SatNode>
  </ASC_CDL>
  <ColorCorrection>
    <SOPNode>
      <Slope>1 1 1</Slope>
      <Offset>0 0 0</Offset>
      <Power>1 1 1</Power>
    </SOPNode>
  </ColorCorrection>
  <LUT1D inBitDepth="32f" outBitDepth="32f" interpolation="linear">
    <IndexMap dim="3">0@0 0.18@1 1@2</IndexMap>
    <Array dim="3 3">0 0 0 0.5 0.5 0.5 1 1 1</Array>
  </LUT1D>
  <LUT3D inBitDepth="32f" outBitDepth="32f" interpolation="tetrahedral">
    <Array dim="2 2 2 3">
      0 0 0 0 0 1 0 1 0 0 1 1
      1 0 0 1 0 1 1 1 0 1 1 1
    </Array>
  </LUT3D>
  <Log inBitDepth="32f" outBitDepth="32f" style="linToLog">
    <LogParams gamma="0.6" refWhite="685" refBlack="95" channel="R"/>
  </Log>
  <Gamma inBitDepth="32f" outBitDepth="32f" style="moncurveFwd">
    <GammaParams gamma="2.4" offset="0.055"/>
  </Gamma>
  <ExposureContrast inBitDepth="32f" outBitDepth="32f" style="video">
    <ECParams exposure="0.5" contrast="1.2" pivot="0.18"/>
    <DynamicParameter param="EXPOSURE"/>
  </ExposureContrast>
  <Group inBitDepth="32f" outBitDepth="32f" bypass="true">
    <Matrix inBitDepth="32f" outBitDepth="32f">
      <Array dim="3 3">1 0 0 0 1 0 0 0 1</Array>
    </Matrix>
  </Group>
  <Reference inBitDepth="32f" outBitDepth="32f" path="missing/target.clf" basePath="luts"/>
</ProcessList>
"#;

fn reparse(bytes: &[u8]) -> ProcessList {
    ProcessList::from_bytes(bytes, &ParseOptions::default()).unwrap()
}

#[test]
fn every_node_type_roundtrips() {
    let list = reparse(ALL_NODES.as_bytes());
    assert_eq!(list.nodes.len(), 11);
    let names: Vec<_> = list.nodes.iter().map(|n| n.element_name()).collect();
    assert_eq!(
        names,
        vec![
            "Matrix",
            "Range",
            "ASC_CDL",
            "ColorCorrection",
            "LUT1D",
            "LUT3D",
            "Log",
            "Gamma",
            "ExposureContrast",
            "Group",
            "Reference"
        ]
    );

    let opts = WriteOptions::default();
    let first = list.to_bytes(&opts).unwrap();
    let again = reparse(&first);
    assert_eq!(again, list);
    let second = again.to_bytes(&opts).unwrap();
    assert_eq!(first, second);
}

#[test]
fn metadata_survives() {
    let list = reparse(ALL_NODES.as_bytes());
    assert_eq!(list.inverse_of.as_deref(), Some("other"));
    let names: Vec<_> = list.elements.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Description", "InputDescriptor", "OutputDescriptor", "Info"]);

    let xml = String::from_utf8(list.to_bytes(&WriteOptions::default()).unwrap()).unwrap();
    assert!(xml.contains("<Copyright>none</Copyright>"));
    assert!(xml.contains(r#"path="missing/target.clf""#));
}

#[test]
fn every_float_encoding_roundtrips() {
    let values = vec![0.0, 0.1, 0.25, 1.0 / 3.0, 1.0, -0.5];
    for encoding in std::iter::once(FloatEncoding::Text).chain(FloatEncoding::BINARY) {
        let lut = Lut1DParams::new(
            Array::table(vec![6, 1], values.clone())
                .unwrap()
                .with_float_encoding(encoding),
        );
        let list = ProcessList::new("enc")
            .with_node(ProcessNode::new(NodeOp::Lut1D(lut)))
            .with_node(ProcessNode::new(NodeOp::Matrix(MatrixParams::scale([0.1, 0.2, 0.3]))));

        let mut encoded = list.clone();
        encoded.set_float_encoding(encoding);
        let first = encoded.to_bytes(&WriteOptions::default()).unwrap();
        let again = reparse(&first);
        let second = again.to_bytes(&WriteOptions::default()).unwrap();
        assert_eq!(first, second, "encoding {}", encoding);

        if let Some(attr) = encoding.attribute() {
            let xml = String::from_utf8(first).unwrap();
            assert!(xml.contains(&format!(r#"floatEncoding="{}""#, attr)));
        }
    }
}

/// LUTs whose samples are spelled at `depth`.
fn luts_at(depth: BitDepth) -> Vec<(&'static str, NodeOp)> {
    let max = depth.max_value() as f64;
    let ramp = vec![0.0, 0.25 * max, 0.5 * max, max];
    let table = || Array::table(vec![4, 1], ramp.clone()).unwrap();

    let half_domain = Lut1DParams::new(table()).with_half_domain(true);
    let mut raw_halfs = Lut1DParams::new(table());
    raw_halfs.raw_halfs = true;

    let mut lattice = Array::identity_3d(2);
    for v in lattice.values_mut() {
        *v *= max;
    }

    vec![
        ("lut1d", NodeOp::Lut1D(Lut1DParams::new(table()))),
        ("halfDomain", NodeOp::Lut1D(half_domain)),
        ("rawHalfs", NodeOp::Lut1D(raw_halfs)),
        ("lut3d", NodeOp::Lut3D(Lut3DParams::new(lattice))),
    ]
}

#[test]
fn every_lut_depth_and_encoding_roundtrips() {
    let depths = [BitDepth::Float32, BitDepth::Float16, BitDepth::Uint10, BitDepth::Uint12];
    let opts = WriteOptions::default();
    for depth in depths {
        for encoding in std::iter::once(FloatEncoding::Text).chain(FloatEncoding::BINARY) {
            for (kind, op) in luts_at(depth) {
                let raw = kind == "rawHalfs";
                let mut list = ProcessList::new("lut")
                    .with_node(ProcessNode::new(op).with_bit_depths(BitDepth::Float32, depth));
                list.set_float_encoding(encoding);

                let first = list.to_bytes(&opts).unwrap();
                let again = reparse(&first);
                let second = again.to_bytes(&opts).unwrap();
                let case = format!("{} {} {}", kind, depth, encoding);
                assert_eq!(first, second, "{}", case);

                let xml = String::from_utf8(second).unwrap();
                match encoding.attribute() {
                    Some(attr) if !raw => {
                        assert!(xml.contains(&format!(r#"floatEncoding="{}""#, attr)), "{}", case)
                    }
                    _ => assert!(!xml.contains("floatEncoding"), "{}", case),
                }

                let last = match &again.nodes[0].op {
                    NodeOp::Lut1D(p) => *p.array.values().last().unwrap(),
                    NodeOp::Lut3D(p) => *p.array.values().last().unwrap(),
                    other => panic!("unexpected node {:?}", other),
                };
                // 4095 is not a half, so 16-bit spellings round it
                assert_relative_eq!(last, depth.max_value() as f64, max_relative = 1e-3);
            }
        }
    }
}

#[test]
fn oversized_dims_are_rejected() {
    let xml = r#"<ProcessList id="big">
      <LUT3D inBitDepth="32f" outBitDepth="32f">
        <Array dim="4294967296 4294967296 2 3">0 0 0</Array>
      </LUT3D>
    </ProcessList>"#;
    let err = ProcessList::from_bytes(xml.as_bytes(), &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, ClfError::Parse(_)), "{}", err);
}

#[test]
fn gzip_input_is_transparent() {
    let plain = reparse(ALL_NODES.as_bytes());
    let gz = plain.to_bytes(&WriteOptions::new().gzip(true)).unwrap();
    assert_eq!(reparse(&gz), plain);
}

#[test]
fn unknown_elements_are_skipped() {
    let xml = r#"<ProcessList id="u">
      <Sparkle intensity="11"><Glitter/></Sparkle>
      <Matrix inBitDepth="32f" outBitDepth="32f">
        <Frobnicate mode="x"/>
        <Array dim="3 3">2 0 0 0 2 0 0 0 2</Array>
      </Matrix>
    </ProcessList>"#;
    let list = reparse(xml.as_bytes());
    assert_eq!(list.nodes.len(), 1);
    assert_eq!(list.process(&[1.0, 1.0, 1.0], 3), vec![2.0, 2.0, 2.0]);
}

#[test]
fn strict_profile_rejects_vendor_features() {
    let strict = ParseOptions::strict();
    let err = ProcessList::from_bytes(ALL_NODES.as_bytes(), &strict).unwrap_err();
    assert!(err.is_unsupported());

    let core = r#"<ProcessList id="core">
      <Matrix inBitDepth="32f" outBitDepth="32f">
        <Array dim="3 3">1 0 0 0 1 0 0 0 1</Array>
      </Matrix>
    </ProcessList>"#;
    assert!(ProcessList::from_bytes(core.as_bytes(), &strict).is_ok());

    let encoded = r#"<ProcessList id="enc">
      <Matrix inBitDepth="32f" outBitDepth="32f">
        <Array dim="3 3" floatEncoding="hex32bit">
          3f800000 0 0 0 3f800000 0 0 0 3f800000
        </Array>
      </Matrix>
    </ProcessList>"#;
    assert!(ProcessList::from_bytes(encoded.as_bytes(), &strict).unwrap_err().is_unsupported());
    assert!(ProcessList::from_bytes(encoded.as_bytes(), &ParseOptions::default()).is_ok());
}
