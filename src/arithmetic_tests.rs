#[cfg(test)]
mod tests {
    use crate::decompressor::{DecompressRequest, Decompressor, Program};
    use crate::error::FailureReason;
    use crate::opcode_tables::Opcode;
    use crate::test_utils::*;
    use test_log::test;

    /// LOAD a, then `op $SCRATCH, b`, and return the resulting word
    fn binary(op: Opcode, a: u16, b: u16) -> Result<u16, FailureReason> {
        let mut p = builder();
        p.op(Opcode::Load).value(SCRATCH).value(a);
        p.op(op).reference(SCRATCH).value(b);
        output_and_end(&mut p, SCRATCH, 2);
        run(&p, &[])
            .map(|outcome| u16::from_be_bytes([outcome.output[0], outcome.output[1]]))
            .map_err(|e| e.reason)
    }

    #[test]
    fn test_bitwise_ops() {
        assert_eq!(binary(Opcode::And, 0xF0F0, 0x3C3C), Ok(0x3030));
        assert_eq!(binary(Opcode::Or, 0xF000, 0x000F), Ok(0xF00F));
    }

    #[test]
    fn test_not() {
        let mut p = builder();
        p.op(Opcode::Load).value(SCRATCH).value(0x00FF);
        p.op(Opcode::Not).reference(SCRATCH);
        output_and_end(&mut p, SCRATCH, 2);
        assert_eq!(run_ok(&p, &[]), vec![0xFF, 0x00]);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(binary(Opcode::Lshift, 1, 15), Ok(0x8000));
        assert_eq!(binary(Opcode::Lshift, 0xFFFF, 16), Ok(0));
        assert_eq!(binary(Opcode::Lshift, 0x0F0F, 4), Ok(0xF0F0));
        assert_eq!(binary(Opcode::Rshift, 0x8000, 15), Ok(1));
        assert_eq!(binary(Opcode::Rshift, 0xFFFF, 20), Ok(0));
    }

    #[test]
    fn test_arithmetic_wraps_modulo_2_16() {
        assert_eq!(binary(Opcode::Add, 40, 2), Ok(42));
        assert_eq!(binary(Opcode::Add, 0xFFFF, 2), Ok(1));
        assert_eq!(binary(Opcode::Subtract, 0, 1), Ok(0xFFFF));
        assert_eq!(binary(Opcode::Multiply, 0x0100, 0x0100), Ok(0));
        assert_eq!(binary(Opcode::Multiply, 300, 7), Ok(2100));
        assert_eq!(binary(Opcode::Divide, 7, 2), Ok(3));
        assert_eq!(binary(Opcode::Remainder, 7, 2), Ok(1));
    }

    #[test]
    fn test_zero_second_operand_fails() {
        for op in [Opcode::Multiply, Opcode::Divide, Opcode::Remainder] {
            for a in [0u16, 1, 65535] {
                assert_eq!(
                    binary(op, a, 0),
                    Err(FailureReason::ZeroOperand),
                    "{} {} by zero",
                    op.name(),
                    a
                );
            }
        }
        assert_eq!(FailureReason::ZeroOperand.code(), 4);
    }

    fn sort_program(op: Opcode) -> Vec<u8> {
        let mut p = builder();
        p.op(Opcode::Multiload).value(SCRATCH).literal(8);
        for v in [3u16, 1, 2, 1, 30, 10, 20, 11] {
            p.value(v);
        }
        p.op(op).value(SCRATCH).value(2).value(4);
        output_and_end(&mut p, SCRATCH, 16);
        run_ok(&p, &[])
    }

    fn words(bytes: &[u8]) -> Vec<u16> {
        bytes
            .chunks(2)
            .map(|w| u16::from_be_bytes([w[0], w[1]]))
            .collect()
    }

    #[test]
    fn test_sort_ascending_is_stable_across_lists() {
        let out = words(&sort_program(Opcode::SortAscending));
        assert_eq!(out, vec![1, 1, 2, 3, 10, 11, 20, 30]);
    }

    #[test]
    fn test_sort_descending_is_stable_across_lists() {
        let out = words(&sort_program(Opcode::SortDescending));
        assert_eq!(out, vec![3, 2, 1, 1, 30, 20, 10, 11]);
    }

    #[test]
    fn test_sort_cycle_cost() {
        let mut p = builder();
        p.op(Opcode::Multiload).value(SCRATCH).literal(8);
        for v in [3u16, 1, 2, 1, 30, 10, 20, 11] {
            p.value(v);
        }
        p.op(Opcode::SortAscending).value(SCRATCH).value(2).value(4);
        output_and_end(&mut p, SCRATCH, 16);
        // MULTILOAD 1 + 8, SORT 1 + 4 * (2 + 2), OUTPUT 1 + 16, END-MESSAGE 1
        assert_eq!(run(&p, &[]).unwrap().cycles_used, 9 + 17 + 17 + 1);
    }

    fn and_program(count: usize) -> (Vec<u8>, u16) {
        let mut p = builder();
        let mut last = p.here();
        for _ in 0..count {
            last = p.here();
            p.op(Opcode::And).reference(0x000A).value(0);
        }
        end_message(&mut p);
        (p.build().unwrap(), last)
    }

    #[test]
    fn test_cycle_budget_exhausted_on_16001st_instruction() {
        let decompressor = Decompressor::default();

        // 15999 ANDs plus END-MESSAGE use exactly the 16000 available cycles
        let (code, _) = and_program(15999);
        let request =
            DecompressRequest::new(Program::bytecode(code, CODE_START), Vec::new()).with_header_length(0);
        let outcome = decompressor.decompress(&request).unwrap();
        assert_eq!(outcome.cycles_used, 16000);

        let (code, last) = and_program(16001);
        let request =
            DecompressRequest::new(Program::bytecode(code, CODE_START), Vec::new()).with_header_length(0);
        let err = decompressor.decompress(&request).unwrap_err();
        assert_eq!(err.reason, FailureReason::CyclesExhausted);
        assert_eq!(err.code(), 15);
        assert_eq!(err.pc, last);
        assert_eq!(err.opcode, Some(Opcode::And.byte()));
    }
}
