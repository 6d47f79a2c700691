use pretty_assertions::assert_eq;

use mockx64::{
    assembler::assemble,
    vm::{self, StepOutcome, Vm},
};

fn run(source: &str) -> Option<i64> {
    let program = assemble(source).unwrap();
    vm::run(program).unwrap()
}

#[test]
fn test_mov_program() {
    assert_eq!(run("mov $5, rax\nret"), Some(5));
}

#[test]
fn test_arithmetic_program() {
    assert_eq!(run("mov $10, rax\nmov $3, rdi\nsub rdi, rax\nret"), Some(7));
}

#[test]
fn test_compare_program() {
    assert_eq!(run("mov $4, rax\ncmp $4, rax\nsete al\nret"), Some(1));
}

#[test]
fn test_stack_program() {
    assert_eq!(run("push $9\npop rax\nret"), Some(9));
}

#[test]
fn test_sum_demo() {
    assert_eq!(run(include_str!("../demos/sum.asm")), Some(15));
}

#[test]
fn test_call_demo() {
    assert_eq!(run(include_str!("../demos/call.asm")), Some(44));
}

#[test]
fn test_greeting_demo() {
    assert_eq!(run(include_str!("../demos/greeting.asm")), Some(177));
}

#[test]
fn test_locals_demo() {
    assert_eq!(run(include_str!("../demos/locals.asm")), Some(54));
}

#[test]
fn test_trace_ends_with_the_final_value() {
    let program = assemble(include_str!("../demos/sum.asm")).unwrap();
    let mut trace = Vm::new(program).trace();

    let steps = trace.by_ref().map(|snapshot| snapshot.unwrap()).count();

    // 6 instructions per loop iteration, 5 iterations, plus the prologue,
    // the exit comparison and the label markers
    assert_eq!(steps, 37);
    assert_eq!(trace.final_value(), Some(15));
}

#[test]
fn test_stepping_matches_run() {
    let source = include_str!("../demos/call.asm");

    let stepped = {
        let mut vm = Vm::new(assemble(source).unwrap());
        loop {
            match vm.step().unwrap() {
                StepOutcome::Running(_) => {}
                StepOutcome::Halted(value) => break value,
            }
        }
    };
    let ran = vm::run(assemble(source).unwrap()).unwrap();

    assert_eq!(stepped, ran);
    assert_eq!(stepped, Some(44));
}
