use super::*;
use crate::NetError;
use crate::spec::ast::OpKind;

fn malformed_message(src: &str) -> String {
    match parse_block_spec(src) {
        Err(NetError::MalformedSpec { spec, message }) => {
            assert_eq!(spec, src);
            message
        }
        other => panic!("expected MalformedSpec for {src:?}, got {other:?}"),
    }
}

#[test]
fn parses_encoder_horizontal_block() {
    let spec = parse_block_spec("prelu(0.25)-conv(3)-prelu(0.25)-conv(3)+skip").unwrap();
    let kinds: Vec<OpKind> = spec.ops.iter().map(OpDescriptor::kind).collect();
    assert_eq!(
        kinds,
        vec![
            OpKind::ParametricActivation,
            OpKind::Convolve,
            OpKind::ParametricActivation,
            OpKind::Convolve,
        ]
    );
    assert_eq!(spec.ops[0], OpDescriptor::ParametricActivation { init: 0.25 });
    assert_eq!(
        spec.ops[1],
        OpDescriptor::Convolve {
            kernel: 3,
            pad: PadMode::Zeros
        }
    );
    assert_eq!(
        spec.flags,
        BlockFlags {
            skip: true,
            no_bias: false,
            no_pad: false
        }
    );
}

#[test]
fn parsing_is_deterministic() {
    let src = "evenize(reflpad)-sconv(5,replpad)-up(shuffle)-prelu(-0.1)+nobias+nopad";
    let a = parse_block_spec(src).unwrap();
    let b = parse_block_spec(src).unwrap();
    assert_eq!(a, b);
}

#[test]
fn arguments_resolve_to_defaults() {
    let spec = parse_block_spec("evenize-conv-sconv-up-prelu").unwrap();
    assert_eq!(
        spec.ops.as_slice(),
        &[
            OpDescriptor::PadToEven {
                pad: PadMode::Zeros
            },
            OpDescriptor::Convolve {
                kernel: 3,
                pad: PadMode::Zeros
            },
            OpDescriptor::StridedConvolve {
                kernel: 3,
                pad: PadMode::Zeros
            },
            OpDescriptor::Upsample {
                algo: UpsampleAlgo::Bilinear
            },
            OpDescriptor::ParametricActivation { init: 0.25 },
        ]
    );
    assert_eq!(spec.flags, BlockFlags::default());
}

#[test]
fn explicit_arguments_are_honoured() {
    let spec = parse_block_spec("evenize(replpad)-conv(7,reflpad)-up(pyramid)-prelu(-0.5)").unwrap();
    assert_eq!(
        spec.ops[0],
        OpDescriptor::PadToEven {
            pad: PadMode::Replicate
        }
    );
    assert_eq!(
        spec.ops[1],
        OpDescriptor::Convolve {
            kernel: 7,
            pad: PadMode::Reflect
        }
    );
    assert_eq!(
        spec.ops[2],
        OpDescriptor::Upsample {
            algo: UpsampleAlgo::Pyramid
        }
    );
    assert_eq!(spec.ops[3], OpDescriptor::ParametricActivation { init: -0.5 });
}

#[test]
fn cumulative_stride_and_channel_steps() {
    let spec = parse_block_spec("prelu(0.25)-sconv(3)-prelu(0.25)-conv(3)").unwrap();
    assert_eq!(spec.cumulative_stride(), 2.0);
    assert_eq!(spec.channel_steps(), 2);

    let spec = parse_block_spec("up(nearest)-conv(3)").unwrap();
    assert_eq!(spec.cumulative_stride(), 0.5);

    let spec = parse_block_spec("sconv-up").unwrap();
    assert_eq!(spec.cumulative_stride(), 1.0);
}

#[test]
fn unknown_keyword_is_malformed() {
    let msg = malformed_message("foo(1)");
    assert!(msg.contains("unknown keyword 'foo'"), "{msg}");
}

#[test]
fn misplaced_evenize_is_malformed() {
    let msg = malformed_message("conv(3)-evenize");
    assert!(msg.contains("'evenize'"), "{msg}");
    assert!(msg.contains("at byte 8"), "{msg}");
}

#[test]
fn unknown_flag_and_argument_are_malformed() {
    assert!(malformed_message("conv(3)+fast").contains("unknown flag 'fast'"));
    assert!(malformed_message("up(bicubic)").contains("'bicubic'"));
    assert!(malformed_message("conv(3,5)").contains("unexpected argument"));
    assert!(malformed_message("prelu(fast)").contains("unexpected argument"));
}

#[test]
fn structural_errors_are_malformed() {
    malformed_message("");
    malformed_message("conv(3");
    malformed_message("conv(3)-");
    malformed_message("conv(2.5)");
    malformed_message("conv(0)");
    malformed_message("conv(3) conv(3)");
    malformed_message("up(nearest,bilinear)");
}

#[test]
fn oversized_kernels_are_malformed() {
    assert!(parse_block_spec("conv(255)").is_ok());
    assert!(malformed_message("conv(256)").contains("1..=255"));
    assert!(malformed_message("sconv(1000000000000000000)").contains("1..=255"));
    malformed_message("conv(1e18)");
}

#[test]
fn registry_covers_every_keyword() {
    for kw in ["evenize", "conv", "sconv", "up", "prelu"] {
        assert!(lookup(kw).is_some(), "{kw}");
    }
    assert!(lookup("conv2").is_none());
}
