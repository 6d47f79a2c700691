use crate::{
    assembler::parser::Program,
    isa::{AluOp, Condition, MovKind, Op, Operand, Register},
    vm::{
        flags::Flags,
        memory::{Address, Memory},
        registers::{RegisterFile, Value},
        snapshot::Snapshot,
        RuntimeError,
    },
};

/// Result of executing one instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The machine is still running; the snapshot records the state after
    /// the instruction that was just executed.
    Running(Snapshot),
    /// The machine has halted with the final register value, if any.
    Halted(Option<i64>),
}

/// The virtual machine.
///
/// Owns all mutable execution state exclusively; one instance runs one
/// program and is discarded afterwards.
#[derive(Debug)]
pub struct Vm {
    program: Program,
    /// Program counter, an index into the instruction list
    pc: usize,
    registers: RegisterFile,
    memory: Memory,
    /// Operand stack used by push/pop
    stack: Vec<Value>,
    /// Return indices saved by `call`
    call_stack: Vec<usize>,
    flags: Flags,
    halted: bool,
    result: Option<i64>,
}

fn apply_alu(op: AluOp, lhs: i64, rhs: i64) -> Result<i64, RuntimeError> {
    Ok(match op {
        AluOp::Add => lhs + rhs,
        AluOp::Sub => lhs - rhs,
        AluOp::Imul => lhs * rhs,
        AluOp::Idiv => {
            if rhs == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            // Floor division
            let quotient = lhs / rhs;
            if lhs % rhs != 0 && (lhs < 0) != (rhs < 0) {
                quotient - 1
            } else {
                quotient
            }
        }
    })
}

fn address_from(value: Value, displacement: i64) -> Address {
    match value {
        Value::Int(base) => Address::Absolute(base + displacement),
        Value::Ref(address) => address.offset(displacement),
    }
}

/// The operand width of a move: 8 bits as soon as one side names an 8-bit
/// alias, otherwise the narrowest named register width.
fn operand_width(src: &Operand, dst: &Operand) -> u8 {
    let named: Vec<u8> = [src, dst]
        .iter()
        .filter_map(|operand| match operand {
            Operand::Register(register) => Some(register.width()),
            _ => None,
        })
        .collect();
    if named.contains(&8) {
        8
    } else {
        named.into_iter().min().unwrap_or(64)
    }
}

impl Vm {
    /// Creates a machine for one program run.
    ///
    /// The leading run of global/byte instructions is materialized into
    /// memory up front; execution then starts at the `main` global if the
    /// program defines one, at index 0 otherwise.
    pub fn new(program: Program) -> Self {
        let mut memory = Memory::new();
        let mut current_global: Option<(String, i64)> = None;
        for instruction in &program.instructions {
            match &instruction.op {
                Op::Global { name } => {
                    memory.store(Address::symbol(name), 0);
                    current_global = Some((name.clone(), 0));
                }
                Op::Byte { value } => {
                    if let Some((name, index)) = &mut current_global {
                        memory.store(
                            Address::Symbol {
                                name: name.clone(),
                                index: *index,
                            },
                            *value,
                        );
                        *index += 1;
                    }
                }
                _ => break,
            }
        }

        let pc = program.symbols.get("g_main").copied().unwrap_or(0);

        Self {
            program,
            pc,
            registers: RegisterFile::new(),
            memory,
            stack: Vec::new(),
            call_stack: Vec::new(),
            flags: Flags::default(),
            halted: false,
            result: None,
        }
    }

    fn is_finished(&self) -> bool {
        self.halted || self.pc >= self.program.instructions.len()
    }

    /// Resolves an operand to the value it denotes, reading through memory
    /// for address operands.
    fn resolve_value(&self, operand: &Operand) -> Result<Value, RuntimeError> {
        match operand {
            Operand::Immediate(value) => Ok(Value::Int(*value)),
            Operand::Register(register) => self.registers.read(*register),
            place => {
                let address = self.effective_address(place)?;
                Ok(Value::Int(self.memory.load(&address)?))
            }
        }
    }

    fn resolve_int(&self, operand: &Operand) -> Result<i64, RuntimeError> {
        self.resolve_value(operand)?.as_int()
    }

    /// Computes the memory location an operand denotes, without reading it.
    fn effective_address(&self, operand: &Operand) -> Result<Address, RuntimeError> {
        match operand {
            Operand::StackSlot(offset) => {
                let base = self.registers.read(Register::Rbp)?.as_int()?;
                Ok(Address::Absolute(base - offset))
            }
            Operand::StackSlotBy(register) => {
                let base = self.registers.read(Register::Rbp)?.as_int()?;
                let offset = self.registers.read(*register)?.as_int()?;
                Ok(Address::Absolute(base - offset))
            }
            Operand::Indexed { base, displacement } => {
                let value = self.registers.read(*base)?;
                Ok(address_from(value, *displacement))
            }
            Operand::Indirect(register) => {
                let value = self.registers.read(*register)?;
                Ok(address_from(value, 0))
            }
            Operand::Global(name) => Ok(Address::symbol(name)),
            Operand::Immediate(_) | Operand::Register(_) => {
                unreachable!("the parser only admits memory operands here")
            }
        }
    }

    fn resolved_target(&self) -> Result<usize, RuntimeError> {
        self.program
            .targets
            .get(self.pc)
            .copied()
            .flatten()
            .ok_or(RuntimeError::UnresolvedTarget { index: self.pc })
    }

    fn exec_mov(&mut self, kind: MovKind, src: &Operand, dst: &Operand) -> Result<(), RuntimeError> {
        let width = operand_width(src, dst);
        let value = self.resolve_value(src)?;
        let value = match kind {
            MovKind::Movzb => Value::Int(value.as_int()? & 0xff),
            MovKind::Movsbq => Value::Int(value.as_int()? as u8 as i8 as i64),
            MovKind::Mov => match value {
                Value::Int(value) if width == 8 => Value::Int(value & 0xff),
                other => other,
            },
        };
        match dst {
            Operand::Register(register) => self.registers.write(*register, value),
            place => {
                let address = self.effective_address(place)?;
                self.memory.store_wide(address, value.as_int()?, width);
            }
        }
        Ok(())
    }

    /// Arithmetic into a register. A register holding a memory reference
    /// keeps its tag; add/sub adjust the referenced address instead.
    fn exec_alu(&mut self, op: AluOp, src: &Operand, dst: Register) -> Result<(), RuntimeError> {
        let rhs = self.resolve_int(src)?;
        let result = match self.registers.read(dst)? {
            Value::Int(lhs) => Value::Int(apply_alu(op, lhs, rhs)?),
            Value::Ref(address) => match op {
                AluOp::Add => Value::Ref(address.offset(rhs)),
                AluOp::Sub => Value::Ref(address.offset(-rhs)),
                AluOp::Imul | AluOp::Idiv => {
                    return Err(RuntimeError::AddressAsValue { address })
                }
            },
        };
        self.registers.write(dst, result);
        Ok(())
    }

    fn exec_set(&mut self, cond: Condition, dst: Register) {
        let value = match cond {
            Condition::Equal => self.flags.zero,
            Condition::NotEqual => !self.flags.zero,
            Condition::Less => self.flags.negative && !self.flags.positive,
            Condition::LessOrEqual => {
                (self.flags.negative && !self.flags.positive) || self.flags.zero
            }
        };
        self.registers.write(dst, Value::Int(i64::from(value)));
        self.flags.clear();
    }

    /// `ret` with an empty call stack terminates the run: the final value is
    /// the first set register in declaration order, read through memory if
    /// it holds a reference.
    fn exec_ret(&mut self) -> Result<(), RuntimeError> {
        if let Some(return_index) = self.call_stack.pop() {
            self.pc = return_index;
            return Ok(());
        }
        self.result = match self.registers.first_set() {
            Some(Value::Int(value)) => Some(value),
            Some(Value::Ref(address)) => Some(self.memory.load(&address)?),
            None => None,
        };
        self.halted = true;
        Ok(())
    }

    fn exec_push(&mut self, src: &Operand) -> Result<(), RuntimeError> {
        // push tolerates an unset register so the usual `push rbp` prologue
        // works on a fresh machine
        let value = match src {
            Operand::Register(register) => self.registers.read_or_default(*register),
            other => self.resolve_value(other)?,
        };
        self.stack.push(value);
        let pointer = self.registers.read_or_default(Register::Rsp).as_int()?;
        self.registers.write(Register::Rsp, Value::Int(pointer + 8));
        Ok(())
    }

    fn exec_pop(&mut self, dst: Register) -> Result<(), RuntimeError> {
        let value = self.stack.pop().ok_or(RuntimeError::EmptyStack)?;
        self.registers.write(dst, value);
        let pointer = self.registers.read_or_default(Register::Rsp).as_int()?;
        self.registers.write(Register::Rsp, Value::Int(pointer - 8));
        Ok(())
    }

    /// Executes the instruction under the program counter and advances it.
    fn execute_instruction(&mut self) -> Result<(), RuntimeError> {
        let instruction = self.program.instructions[self.pc].clone();
        match &instruction.op {
            Op::Mov { kind, src, dst } => {
                self.exec_mov(*kind, src, dst)?;
                self.pc += 1;
            }
            Op::Alu { op, src, dst } => {
                self.exec_alu(*op, src, *dst)?;
                self.pc += 1;
            }
            Op::Neg { dst } => {
                let value = self.registers.read(*dst)?.as_int()?;
                self.registers.write(*dst, Value::Int(-value));
                self.pc += 1;
            }
            Op::Push { src } => {
                self.exec_push(src)?;
                self.pc += 1;
            }
            Op::Pop { dst } => {
                self.exec_pop(*dst)?;
                self.pc += 1;
            }
            Op::Cmp { src, dst } => {
                let rhs = self.resolve_int(src)?;
                let lhs = self.resolve_int(dst)?;
                self.flags.set_from_difference(lhs - rhs);
                self.pc += 1;
            }
            Op::Set { cond, dst } => {
                self.exec_set(*cond, *dst);
                self.pc += 1;
            }
            Op::Lea { src, dst } => {
                let address = self.effective_address(src)?;
                self.registers.write(*dst, Value::Ref(address));
                self.pc += 1;
            }
            Op::Jmp { .. } => {
                self.pc = self.resolved_target()?;
            }
            Op::Je { .. } => {
                if self.flags.zero {
                    self.pc = self.resolved_target()?;
                } else {
                    self.pc += 1;
                }
                self.flags.clear();
            }
            Op::Call { .. } => {
                let target = self.resolved_target()?;
                self.call_stack.push(self.pc + 1);
                self.pc = target;
            }
            Op::Ret => self.exec_ret()?,
            Op::Cqo | Op::Label { .. } | Op::Global { .. } | Op::Byte { .. } => {
                self.pc += 1;
            }
        }
        Ok(())
    }

    fn snapshot(&self, line: u32) -> Snapshot {
        Snapshot {
            line,
            flags: self.flags,
            registers: self.registers.snapshot(),
            memory: self.memory.cells().clone(),
            stack: self.stack.clone(),
        }
    }

    /// Executes one instruction.
    ///
    /// While the machine keeps running this yields a snapshot of the state
    /// after the executed instruction; the terminal `ret` yields the final
    /// value instead.
    #[tracing::instrument(skip(self))]
    pub fn step(&mut self) -> Result<StepOutcome, RuntimeError> {
        if self.is_finished() {
            return Ok(StepOutcome::Halted(self.result));
        }
        let line = self.program.instructions[self.pc].line;
        self.execute_instruction()?;
        if self.halted {
            Ok(StepOutcome::Halted(self.result))
        } else {
            Ok(StepOutcome::Running(self.snapshot(line)))
        }
    }

    /// Runs the program to completion without snapshot overhead and returns
    /// the final register value, if any.
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Result<Option<i64>, RuntimeError> {
        while !self.is_finished() {
            self.execute_instruction()?;
        }
        Ok(self.result)
    }

    /// Turns the machine into a forward-only snapshot iterator.
    pub fn trace(self) -> Trace {
        Trace {
            vm: self,
            finished: false,
            final_value: None,
        }
    }
}

/// Single-consumer, forward-only iterator over per-instruction snapshots.
///
/// After the iterator is exhausted the final register value is available
/// from [`Trace::final_value`]. Dropping it early leaves the machine state
/// as-is; no cleanup is required.
#[derive(Debug)]
pub struct Trace {
    vm: Vm,
    finished: bool,
    final_value: Option<i64>,
}

impl Trace {
    pub fn final_value(&self) -> Option<i64> {
        self.final_value
    }
}

impl Iterator for Trace {
    type Item = Result<Snapshot, RuntimeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.vm.step() {
            Ok(StepOutcome::Running(snapshot)) => Some(Ok(snapshot)),
            Ok(StepOutcome::Halted(value)) => {
                self.finished = true;
                self.final_value = value;
                None
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}
