//! LR35902 (Game Boy CPU) linear disassembly.
//!
//! Mnemonic templates use lowercase placeholders: `n` is an 8-bit operand and
//! `nn` a little-endian 16-bit operand. `JR` operands are signed offsets and
//! are rendered as absolute targets.

use std::fmt;

const UNDEFINED: &str = "???";
const CB_PREFIX: u8 = 0xCB;

#[rustfmt::skip]
const OPCODES: [&str; 256] = [
    // 0x00
    "NOP", "LD BC,nn", "LD [BC],A", "INC BC", "INC B", "DEC B", "LD B,n", "RLCA",
    "LD [nn],SP", "ADD HL,BC", "LD A,[BC]", "DEC BC", "INC C", "DEC C", "LD C,n", "RRCA",
    // 0x10
    "STOP", "LD DE,nn", "LD [DE],A", "INC DE", "INC D", "DEC D", "LD D,n", "RLA",
    "JR n", "ADD HL,DE", "LD A,[DE]", "DEC DE", "INC E", "DEC E", "LD E,n", "RRA",
    // 0x20
    "JR NZ,n", "LD HL,nn", "LD [HL+],A", "INC HL", "INC H", "DEC H", "LD H,n", "DAA",
    "JR Z,n", "ADD HL,HL", "LD A,[HL+]", "DEC HL", "INC L", "DEC L", "LD L,n", "CPL",
    // 0x30
    "JR NC,n", "LD SP,nn", "LD [HL-],A", "INC SP", "INC [HL]", "DEC [HL]", "LD [HL],n", "SCF",
    "JR C,n", "ADD HL,SP", "LD A,[HL-]", "DEC SP", "INC A", "DEC A", "LD A,n", "CCF",
    // 0x40
    "LD B,B", "LD B,C", "LD B,D", "LD B,E", "LD B,H", "LD B,L", "LD B,[HL]", "LD B,A",
    "LD C,B", "LD C,C", "LD C,D", "LD C,E", "LD C,H", "LD C,L", "LD C,[HL]", "LD C,A",
    // 0x50
    "LD D,B", "LD D,C", "LD D,D", "LD D,E", "LD D,H", "LD D,L", "LD D,[HL]", "LD D,A",
    "LD E,B", "LD E,C", "LD E,D", "LD E,E", "LD E,H", "LD E,L", "LD E,[HL]", "LD E,A",
    // 0x60
    "LD H,B", "LD H,C", "LD H,D", "LD H,E", "LD H,H", "LD H,L", "LD H,[HL]", "LD H,A",
    "LD L,B", "LD L,C", "LD L,D", "LD L,E", "LD L,H", "LD L,L", "LD L,[HL]", "LD L,A",
    // 0x70
    "LD [HL],B", "LD [HL],C", "LD [HL],D", "LD [HL],E", "LD [HL],H", "LD [HL],L", "HALT", "LD [HL],A",
    "LD A,B", "LD A,C", "LD A,D", "LD A,E", "LD A,H", "LD A,L", "LD A,[HL]", "LD A,A",
    // 0x80
    "ADD A,B", "ADD A,C", "ADD A,D", "ADD A,E", "ADD A,H", "ADD A,L", "ADD A,[HL]", "ADD A,A",
    "ADC A,B", "ADC A,C", "ADC A,D", "ADC A,E", "ADC A,H", "ADC A,L", "ADC A,[HL]", "ADC A,A",
    // 0x90
    "SUB B", "SUB C", "SUB D", "SUB E", "SUB H", "SUB L", "SUB [HL]", "SUB A",
    "SBC A,B", "SBC A,C", "SBC A,D", "SBC A,E", "SBC A,H", "SBC A,L", "SBC A,[HL]", "SBC A,A",
    // 0xA0
    "AND B", "AND C", "AND D", "AND E", "AND H", "AND L", "AND [HL]", "AND A",
    "XOR B", "XOR C", "XOR D", "XOR E", "XOR H", "XOR L", "XOR [HL]", "XOR A",
    // 0xB0
    "OR B", "OR C", "OR D", "OR E", "OR H", "OR L", "OR [HL]", "OR A",
    "CP B", "CP C", "CP D", "CP E", "CP H", "CP L", "CP [HL]", "CP A",
    // 0xC0
    "RET NZ", "POP BC", "JP NZ,nn", "JP nn", "CALL NZ,nn", "PUSH BC", "ADD A,n", "RST 00",
    "RET Z", "RET", "JP Z,nn", "PREFIX CB", "CALL Z,nn", "CALL nn", "ADC A,n", "RST 08",
    // 0xD0
    "RET NC", "POP DE", "JP NC,nn", "???", "CALL NC,nn", "PUSH DE", "SUB n", "RST 10",
    "RET C", "RETI", "JP C,nn", "???", "CALL C,nn", "???", "SBC A,n", "RST 18",
    // 0xE0
    "LDH [n],A", "POP HL", "LD [C],A", "???", "???", "PUSH HL", "AND n", "RST 20",
    "ADD SP,n", "JP HL", "LD [nn],A", "???", "???", "???", "XOR n", "RST 28",
    // 0xF0
    "LDH A,[n]", "POP AF", "LD A,[C]", "DI", "???", "PUSH AF", "OR n", "RST 30",
    "LD HL,SP+n", "LD SP,HL", "LD A,[nn]", "EI", "???", "???", "CP n", "RST 38",
];

const CB_OPS: [&str; 8] = ["RLC", "RRC", "RL", "RR", "SLA", "SRA", "SWAP", "SRL"];
const CB_REGS: [&str; 8] = ["B", "C", "D", "E", "H", "L", "[HL]", "A"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub address: u64,
    pub bytes: Vec<u8>,
    pub mnemonic: String,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self
            .bytes
            .iter()
            .map(|byte| format!("{byte:02X}"))
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{:04X}: {:<12} {}", self.address, bytes, self.mnemonic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    None,
    Byte,
    Relative,
    Word,
}

fn operand(template: &str) -> Operand {
    if template.contains("nn") {
        Operand::Word
    } else if template.contains('n') {
        if template.starts_with("JR") {
            Operand::Relative
        } else {
            Operand::Byte
        }
    } else {
        Operand::None
    }
}

pub fn disassemble(data: &[u8], base: u64) -> Vec<Instruction> {
    let mut out = Vec::new();
    let mut pc = 0usize;
    while pc < data.len() {
        let instruction = decode_at(data, pc, base + pc as u64);
        pc += instruction.bytes.len();
        out.push(instruction);
    }
    out
}

fn decode_at(data: &[u8], pc: usize, address: u64) -> Instruction {
    let opcode = data[pc];
    let template = OPCODES[usize::from(opcode)];
    let rest = &data[pc + 1..];

    if template == UNDEFINED {
        return single(address, opcode, format!("DB 0x{opcode:02X}"));
    }
    if opcode == CB_PREFIX {
        return match rest.first() {
            Some(&op) => Instruction {
                address,
                bytes: vec![opcode, op],
                mnemonic: decode_cb(op),
            },
            None => single(address, opcode, template.to_string()),
        };
    }

    match operand(template) {
        Operand::None => single(address, opcode, template.to_string()),
        Operand::Byte | Operand::Relative if rest.is_empty() => {
            single(address, opcode, template.to_string())
        }
        Operand::Byte => {
            let value = rest[0];
            Instruction {
                address,
                bytes: vec![opcode, value],
                mnemonic: template.replacen('n', &format!("0x{value:02X}"), 1),
            }
        }
        Operand::Relative => {
            let value = rest[0];
            let mut target = address as i64 + 2 + i64::from(value as i8);
            if target < 0 {
                target += 0x1_0000;
            }
            Instruction {
                address,
                bytes: vec![opcode, value],
                mnemonic: template.replacen('n', &format!("0x{target:04X}"), 1),
            }
        }
        Operand::Word => match rest {
            [lo, hi, ..] => {
                let value = u16::from_le_bytes([*lo, *hi]);
                Instruction {
                    address,
                    bytes: vec![opcode, *lo, *hi],
                    mnemonic: template.replacen("nn", &format!("0x{value:04X}"), 1),
                }
            }
            _ => single(address, opcode, template.to_string()),
        },
    }
}

fn single(address: u64, opcode: u8, mnemonic: String) -> Instruction {
    Instruction {
        address,
        bytes: vec![opcode],
        mnemonic,
    }
}

fn decode_cb(op: u8) -> String {
    let reg = CB_REGS[usize::from(op & 0x07)];
    let bit = (op >> 3) & 0x07;
    match op >> 6 {
        0 => format!("{} {reg}", CB_OPS[usize::from(bit)]),
        1 => format!("BIT {bit},{reg}"),
        2 => format!("RES {bit},{reg}"),
        _ => format!("SET {bit},{reg}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(data: &[u8], base: u64) -> Vec<String> {
        disassemble(data, base)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn operands_are_substituted() {
        let out = lines(&[0x00, 0x3E, 0x12, 0xC3, 0x50, 0x01, 0xE0, 0x40], 0x100);
        assert_eq!(
            out,
            [
                "0100: 00           NOP",
                "0101: 3E 12        LD A,0x12",
                "0103: C3 50 01     JP 0x0150",
                "0106: E0 40        LDH [0x40],A",
            ]
        );
    }

    #[test]
    fn relative_jumps_show_targets() {
        let out = lines(&[0x18, 0xFE, 0x20, 0x05], 0x0200);
        assert_eq!(out[0], "0200: 18 FE        JR 0x0200");
        assert_eq!(out[1], "0202: 20 05        JR NZ,0x0209");
    }

    #[test]
    fn unknown_and_truncated_opcodes() {
        let out = lines(&[0xD3, 0xCD, 0x34], 0);
        assert_eq!(out[0], "0000: D3           DB 0xD3");
        assert_eq!(out[1], "0001: CD           CALL nn");
        assert_eq!(out[2], "0002: 34           INC [HL]");
    }

    #[test]
    fn cb_prefix_is_decoded() {
        let out = lines(&[0xCB, 0x37, 0xCB, 0x7E, 0xCB, 0xC7, 0xCB], 0);
        assert_eq!(
            out,
            [
                "0000: CB 37        SWAP A",
                "0002: CB 7E        BIT 7,[HL]",
                "0004: CB C7        SET 0,A",
                "0006: CB           PREFIX CB",
            ]
        );
    }

    #[test]
    fn every_opcode_decodes() {
        for opcode in 0..=255u8 {
            let out = disassemble(&[opcode, 0x00, 0x00], 0);
            assert!(!out.is_empty());
            assert_eq!(out.iter().map(|i| i.bytes.len()).sum::<usize>(), 3);
        }
    }
}
