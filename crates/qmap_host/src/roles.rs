use anyhow::Result;
use qmap_core::roles::{Role, classify_roles};
use qmap_io::parser;
use std::path::Path;

/// Prints the role partition and coordinate table of a circuit.
pub fn print_roles(circuit_path: &Path) -> Result<()> {
    let circuit = parser::load_circuit_file(circuit_path)?;
    let roles = classify_roles(circuit.instructions());
    let coords = circuit.qubit_coords();

    println!("Circuit: {}", circuit_path.display());
    println!("Instructions (flattened): {}", circuit.instructions().len());
    for (kind, qubits) in parser::kind_histogram(&circuit) {
        println!("  {:?}: {} targets", kind, qubits);
    }
    println!("Measurements per shot: {}", circuit.num_measurements());
    println!("-------------------------------");
    println!("ancx: {:?}", roles.anc_x());
    println!("ancz: {:?}", roles.anc_z());
    println!("data: {:?}", roles.data().collect::<Vec<_>>());
    println!("-------------------------------");

    for qubit in roles.measured_qubits() {
        let role = roles.role_of(qubit).unwrap_or(Role::Data);
        match coords.get(qubit) {
            Some(c) => println!("{:>5} {:<4} ({}, {})", qubit, role.as_str(), c.x, c.y),
            None => println!("{:>5} {:<4} (no coordinates)", qubit, role.as_str()),
        }
    }

    Ok(())
}
